//! # Reference Consistency
//!
//! Final normalization of a resolved graph:
//! - association lists rebuilt from the included entity sets
//! - author and comment redaction through the [`Redact`] capability
//! - moment tensor inversion details stripped on request

use crate::graph::EventGraph;
use crate::{
    Amplitude, CreationInfo, Event, FocalMechanism, Magnitude, MomentTensor, Origin, Pick,
    StationMagnitude,
};

// =============================================================================
// REDACTION CAPABILITY
// =============================================================================

/// Redaction implemented by every entity kind that carries comments or
/// creation metadata.
///
/// `strip_author` only touches the object itself; `strip_comments` also
/// recurses into owned children.
pub trait Redact {
    fn strip_comments(&mut self);

    fn strip_author(&mut self);
}

fn blank_author(creation_info: &mut Option<CreationInfo>) {
    if let Some(ci) = creation_info {
        ci.author = None;
    }
}

impl Redact for Event {
    fn strip_comments(&mut self) {
        self.comments.clear();
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for Origin {
    fn strip_comments(&mut self) {
        self.comments.clear();
        self.magnitudes.iter_mut().for_each(Redact::strip_comments);
        self.station_magnitudes
            .iter_mut()
            .for_each(Redact::strip_comments);
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for Magnitude {
    fn strip_comments(&mut self) {
        self.comments.clear();
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for StationMagnitude {
    fn strip_comments(&mut self) {
        self.comments.clear();
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for FocalMechanism {
    fn strip_comments(&mut self) {
        self.comments.clear();
        self.moment_tensors
            .iter_mut()
            .for_each(Redact::strip_comments);
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for MomentTensor {
    fn strip_comments(&mut self) {
        self.comments.clear();
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for Pick {
    fn strip_comments(&mut self) {
        self.comments.clear();
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

impl Redact for Amplitude {
    fn strip_comments(&mut self) {
        self.comments.clear();
    }

    fn strip_author(&mut self) {
        blank_author(&mut self.creation_info);
    }
}

// =============================================================================
// GRAPH PASSES
// =============================================================================

/// Blank authors on the event, focal mechanisms, their moment tensors,
/// included origins and their magnitudes. Agency IDs are kept.
pub fn strip_authors(graph: &mut EventGraph) {
    graph.event.strip_author();
    for focal_mechanism in graph.focal_mechanisms.values_mut() {
        focal_mechanism.strip_author();
        focal_mechanism
            .moment_tensors
            .iter_mut()
            .for_each(Redact::strip_author);
    }
    for origin in graph.origins.values_mut() {
        origin.strip_author();
        origin.magnitudes.iter_mut().for_each(Redact::strip_author);
    }
    graph
        .detached_magnitudes
        .values_mut()
        .for_each(Redact::strip_author);
}

/// Remove every comment in the graph.
pub fn strip_comments(graph: &mut EventGraph) {
    graph.event.strip_comments();
    graph.origins.values_mut().for_each(Redact::strip_comments);
    graph
        .focal_mechanisms
        .values_mut()
        .for_each(Redact::strip_comments);
    graph
        .detached_magnitudes
        .values_mut()
        .for_each(Redact::strip_comments);
    graph.picks.values_mut().for_each(Redact::strip_comments);
    graph.amplitudes.values_mut().for_each(Redact::strip_comments);
}

/// Clear green's function and station/phase setup of a moment tensor.
pub fn strip_moment_tensor_contributions(tensor: &mut MomentTensor) {
    tensor.greens_function_id = None;
    tensor.station_contributions.clear();
    tensor.phase_settings.clear();
}

/// Make the event's association lists exactly the included ID sets.
pub fn rebuild_references(graph: &mut EventGraph) {
    graph.event.origin_refs = graph.origins.keys().cloned().collect();
    graph.event.focal_mechanism_refs = graph.focal_mechanisms.keys().cloned().collect();
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Comment, PublicId};
    use chrono::{TimeZone, Utc};

    fn authored() -> Option<CreationInfo> {
        Some(CreationInfo {
            agency_id: Some("GFZ".to_string()),
            author: Some("scautoloc@geofon".to_string()),
            creation_time: None,
        })
    }

    fn graph() -> EventGraph {
        let mut event = Event::new("event/1");
        event.creation_info = authored();
        event.comments.push(Comment::new("felt"));
        event.origin_refs = vec![PublicId::new("origin/stale")];

        let time = Utc
            .with_ymd_and_hms(2021, 4, 3, 1, 16, 40)
            .single()
            .expect("valid time");
        let mut origin = Origin::new("origin/1", time, -58.05, -7.88, 17.9);
        origin.creation_info = authored();
        origin.comments.push(Comment::new("reviewed"));
        let mut magnitude = Magnitude::new("mag/1", "Mw", 6.6);
        magnitude.creation_info = authored();
        magnitude.comments.push(Comment::new("mag comment"));
        origin.magnitudes.push(magnitude);

        let mut focal_mechanism = FocalMechanism::new("fm/1");
        focal_mechanism.creation_info = authored();
        let mut tensor = MomentTensor {
            public_id: PublicId::new("mt/1"),
            greens_function_id: Some("gemini".to_string()),
            creation_info: authored(),
            ..MomentTensor::default()
        };
        tensor
            .phase_settings
            .push(crate::MomentTensorPhaseSetting::default());
        focal_mechanism.moment_tensors.push(tensor);

        let mut graph = EventGraph::new(event);
        graph.insert_origin(origin);
        graph.insert_focal_mechanism(focal_mechanism);
        graph
    }

    #[test]
    fn authors_are_blanked_but_agencies_kept() {
        let mut graph = graph();
        strip_authors(&mut graph);

        let ci = graph.event().creation_info.clone().expect("creation info");
        assert_eq!(ci.author, None);
        assert_eq!(ci.agency_id.as_deref(), Some("GFZ"));

        let mag = graph.magnitude("mag/1").expect("magnitude");
        assert_eq!(mag.agency_id(), Some("GFZ"));
        assert!(mag.creation_info.as_ref().is_some_and(|c| c.author.is_none()));

        let fm = graph.focal_mechanism("fm/1").expect("fm");
        let mt = fm.moment_tensor().expect("mt");
        assert!(mt.creation_info.as_ref().is_some_and(|c| c.author.is_none()));
    }

    #[test]
    fn comments_are_stripped_recursively() {
        let mut graph = graph();
        strip_comments(&mut graph);
        assert!(graph.event().comments.is_empty());
        let origin = graph.origin("origin/1").expect("origin");
        assert!(origin.comments.is_empty());
        assert!(origin.magnitudes.iter().all(|m| m.comments.is_empty()));
    }

    #[test]
    fn references_match_included_sets() {
        let mut graph = graph();
        rebuild_references(&mut graph);
        assert_eq!(graph.event().origin_refs, vec![PublicId::new("origin/1")]);
        assert_eq!(
            graph.event().focal_mechanism_refs,
            vec![PublicId::new("fm/1")]
        );
    }

    #[test]
    fn moment_tensor_contributions_are_cleared() {
        let mut graph = graph();
        let fm = graph.focal_mechanisms.get_mut("fm/1").expect("fm");
        let mt = fm.moment_tensors.first_mut().expect("mt");
        strip_moment_tensor_contributions(mt);
        assert!(mt.greens_function_id.is_none());
        assert!(mt.phase_settings.is_empty());
    }
}
