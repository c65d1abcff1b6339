//! # Reporting
//!
//! Renders the current assignment for an administrator's reveal.
//!
//! | Format | Output |
//! |--------|--------|
//! | text   | one line per matched participant |
//! | pretty | one arrow chain per cycle, cycles separated by a blank line |
//! | graph  | abstract node/edge lists for an external renderer |
//!
//! Only fully matched participants are reported. Output is a pure function
//! of the snapshot (and, for graphs, the injected rng).

use crate::cycles::decompose;
use crate::graph::AssignmentGraph;
use crate::primitives::MAX_REVEAL_COUNT;
use crate::{ParticipantId, Snapshot, SwapError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// SELECTORS
// =============================================================================

/// Which reveal to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealFormat {
    #[default]
    Text,
    Pretty,
    Graph,
}

impl RevealFormat {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RevealFormat::Text => "text",
            RevealFormat::Pretty => "pretty",
            RevealFormat::Graph => "graph",
        }
    }
}

impl std::fmt::Display for RevealFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RevealFormat {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [RevealFormat::Text, RevealFormat::Pretty, RevealFormat::Graph]
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SwapError::InvalidInput(format!("unknown reveal format: {s}")))
    }
}

/// Layout policy handed to the external renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphLayout {
    /// Nodes on a fixed circle.
    Circle,
    /// Uniformly random positions.
    Random,
    /// Force-directed, Kamada-Kawai.
    KamadaKawai,
    /// Force-directed, Fruchterman-Reingold spring model.
    Spring,
    /// Eigenvectors of the graph Laplacian.
    #[default]
    Spectral,
    /// Pick one of the concrete layouts at random.
    Randomize,
}

impl GraphLayout {
    /// The layouts a renderer actually implements.
    pub const CONCRETE: [GraphLayout; 5] = [
        GraphLayout::Circle,
        GraphLayout::Random,
        GraphLayout::KamadaKawai,
        GraphLayout::Spring,
        GraphLayout::Spectral,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            GraphLayout::Circle => "circle",
            GraphLayout::Random => "random",
            GraphLayout::KamadaKawai => "kamada_kawai",
            GraphLayout::Spring => "spring",
            GraphLayout::Spectral => "spectral",
            GraphLayout::Randomize => "randomize",
        }
    }

    /// Replace `Randomize` with a uniformly chosen concrete layout.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> GraphLayout {
        match self {
            GraphLayout::Randomize => Self::CONCRETE[rng.gen_range(0..Self::CONCRETE.len())],
            concrete => concrete,
        }
    }
}

impl std::fmt::Display for GraphLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GraphLayout {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CONCRETE
            .into_iter()
            .chain([GraphLayout::Randomize])
            .find(|l| l.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SwapError::InvalidInput(format!("unknown graph layout: {s}")))
    }
}

// =============================================================================
// OUTPUT TYPES
// =============================================================================

/// A node of a reveal graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ParticipantId,
    /// Display name with emoji stripped.
    pub label: String,
}

/// One drawable reveal, laid out by an external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealGraph {
    /// Concrete layout, never `Randomize`.
    pub layout: GraphLayout,
    /// Seed for layouts with random placement, distinct per graph.
    pub seed: u64,
    /// Nodes in ascending id order.
    pub nodes: Vec<GraphNode>,
    /// Giftee edges `(santa, giftee)`, in ascending santa order.
    pub edges: Vec<(ParticipantId, ParticipantId)>,
}

/// A rendered reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "report", rename_all = "snake_case")]
pub enum Reveal {
    Text(String),
    Pretty(String),
    Graph(Vec<RevealGraph>),
}

// =============================================================================
// RENDERING
// =============================================================================

/// Produce a reveal in the requested format.
///
/// # Errors
///
/// - `NoMatchedParticipants` if nobody is fully matched.
/// - `InvalidInput` if a graph reveal asks for 0 or more than
///   [`MAX_REVEAL_COUNT`] graphs.
/// - Any integrity error while decomposing the assignment.
pub fn reveal<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    format: RevealFormat,
    layout: GraphLayout,
    count: usize,
    rng: &mut R,
) -> Result<Reveal, SwapError> {
    Ok(match format {
        RevealFormat::Text => Reveal::Text(text_report(snapshot)?),
        RevealFormat::Pretty => Reveal::Pretty(pretty_report(snapshot)?),
        RevealFormat::Graph => Reveal::Graph(reveal_graphs(snapshot, layout, count, rng)?),
    })
}

/// `"{name} is gifting to {giftee} and is being gifted by {santa}"` per
/// matched participant, in id order.
pub fn text_report(snapshot: &Snapshot) -> Result<String, SwapError> {
    let lines: Vec<String> = snapshot
        .matched()
        .filter_map(|p| {
            let (giftee, santa) = (p.giftee?, p.santa?);
            Some(format!(
                "{} is gifting to {} and is being gifted by {}",
                p.name,
                snapshot.name_of(giftee),
                snapshot.name_of(santa)
            ))
        })
        .collect();

    if lines.is_empty() {
        return Err(SwapError::NoMatchedParticipants);
    }
    Ok(lines.join("\n"))
}

/// One chain per cycle: backtick-quoted names joined by `➜`, closing back
/// on the first name. Cycles are separated by a blank line.
pub fn pretty_report(snapshot: &Snapshot) -> Result<String, SwapError> {
    let graph = AssignmentGraph::from_snapshot(snapshot)?;
    let cycles = decompose(&graph)?;
    if cycles.is_empty() {
        return Err(SwapError::NoMatchedParticipants);
    }

    let chains: Vec<String> = cycles
        .iter()
        .map(|cycle| {
            let members = cycle.members();
            members
                .iter()
                .chain(members.first())
                .map(|&id| format!("`{}`", snapshot.name_of(id)))
                .collect::<Vec<_>>()
                .join("➜")
        })
        .collect();

    Ok(chains.join("\n\n"))
}

/// `count` abstract graphs of the assignment.
///
/// `Randomize` is resolved once, so every graph of one reveal shares a layout.
pub fn reveal_graphs<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    layout: GraphLayout,
    count: usize,
    rng: &mut R,
) -> Result<Vec<RevealGraph>, SwapError> {
    if count == 0 || count > MAX_REVEAL_COUNT {
        return Err(SwapError::InvalidInput(format!(
            "graph count must be between 1 and {MAX_REVEAL_COUNT}, got {count}"
        )));
    }

    let graph = AssignmentGraph::from_snapshot(snapshot)?;
    let edges = graph.edges();
    if edges.is_empty() {
        return Err(SwapError::NoMatchedParticipants);
    }

    let nodes: Vec<GraphNode> = graph
        .matched_ids()
        .into_iter()
        .map(|id| GraphNode {
            id,
            label: graph_label(snapshot, id),
        })
        .collect();

    let layout = layout.resolve(rng);
    tracing::debug!(layout = %layout, count, nodes = nodes.len(), "building reveal graphs");

    Ok((0..count)
        .map(|_| RevealGraph {
            layout,
            seed: rng.r#gen(),
            nodes: nodes.clone(),
            edges: edges.clone(),
        })
        .collect())
}

fn graph_label(snapshot: &Snapshot, id: ParticipantId) -> String {
    let label = filter_emoji(&snapshot.name_of(id));
    if label.trim().is_empty() {
        id.to_string()
    } else {
        label
    }
}

// =============================================================================
// EMOJI FILTER
// =============================================================================

/// Code point ranges stripped from graph labels.
const EMOJI_RANGES: [(u32, u32); 6] = [
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map symbols
    (0x1F1E0, 0x1F1FF), // flags
    (0x2702, 0x27B0),   // dingbats
    (0x24C2, 0x1F251),  // enclosed characters and everything in between
];

/// Remove emoji (and the wide legacy range the renderer font cannot draw).
#[must_use]
pub fn filter_emoji(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let cp = u32::from(c);
            !EMOJI_RANGES
                .iter()
                .any(|&(lo, hi)| (lo..=hi).contains(&cp))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
