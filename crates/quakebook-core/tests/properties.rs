//! # Property-Based Tests
//!
//! Graph consistency, determinism of the binary format and fixed-width
//! rendering over generated inputs.

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::collection::vec;
use proptest::prelude::*;
use quakebook_core::{
    Arrival, Bulletin, BulletinOptions, CubeOptions, Event, EventGraph, Magnitude, Origin,
    OriginQuality, OriginUncertainty, Pick, PublicId, QuakeError, RealQuantity,
    SerializableEventGraph, WaveformStreamId, cube_format, graph_from_bytes, graph_to_bytes,
    menlo_check_char,
};

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 4, 3, 1, 16, 40)
        .single()
        .expect("valid time")
}

/// Event referencing `count` origins, the first one preferred.
fn event_with_origins(count: usize) -> SerializableEventGraph {
    let ids: Vec<PublicId> = (0..count)
        .map(|i| PublicId::new(format!("origin/{i}")))
        .collect();
    let mut event = Event::new("gfz2021gmyq");
    event.preferred_origin_id = ids.first().cloned();
    event.origin_refs = ids.clone();

    let origins = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut origin = Origin::new(id.as_str(), base_time(), -58.0, -7.9, 10.0);
            origin
                .magnitudes
                .push(Magnitude::new(format!("mag/{i}"), "mb", 5.0));
            origin
        })
        .collect();

    SerializableEventGraph {
        event,
        origins,
        focal_mechanisms: Vec::new(),
        magnitudes: Vec::new(),
        picks: Vec::new(),
        amplitudes: Vec::new(),
        diagnostics: Vec::new(),
    }
}

fn optional_count() -> impl Strategy<Value = Option<u32>> {
    prop::option::of(0u32..1000)
}

// =============================================================================
// GRAPH CONSISTENCY
// =============================================================================

proptest! {
    /// Every referenced origin included and every included origin referenced.
    #[test]
    fn complete_reference_set_is_accepted(count in 1usize..12) {
        let graph = EventGraph::try_from(event_with_origins(count)).expect("consistent graph");
        prop_assert_eq!(graph.origins().count(), count);
        prop_assert_eq!(graph.magnitudes().count(), count);
        prop_assert!(graph.verify().is_ok());
    }

    /// Dropping a reference leaves an unreferenced origin behind.
    #[test]
    fn unreferenced_origin_is_rejected(count in 2usize..12, pick in any::<prop::sample::Index>()) {
        let mut sg = event_with_origins(count);
        // Keep the preferred origin referenced so only the bijection breaks.
        let victim = 1 + pick.index(count - 1);
        sg.event.origin_refs.remove(victim);
        prop_assert!(matches!(
            EventGraph::try_from(sg),
            Err(QuakeError::InvariantViolation(_))
        ));
    }

    /// A reference without a matching origin is dangling.
    #[test]
    fn dangling_reference_is_rejected(count in 1usize..12) {
        let mut sg = event_with_origins(count);
        sg.event.origin_refs.push(PublicId::new("origin/absent"));
        prop_assert!(matches!(
            EventGraph::try_from(sg),
            Err(QuakeError::InvariantViolation(_))
        ));
    }

    /// Magnitude IDs are unique across the whole graph.
    #[test]
    fn repeated_magnitude_id_is_rejected(count in 2usize..12, pick in any::<prop::sample::Index>()) {
        let mut sg = event_with_origins(count);
        let target = pick.index(count);
        let twin = (target + 1) % count;
        let id = sg.origins[twin].magnitudes[0].public_id.clone();
        sg.origins[target].magnitudes[0].public_id = id;
        prop_assert!(EventGraph::try_from(sg).is_err());
    }

    /// Serialized bytes do not depend on insertion order and survive reloading.
    #[test]
    fn binary_encoding_is_stable(count in 1usize..10, seed in any::<u64>()) {
        let forward = EventGraph::try_from(event_with_origins(count)).expect("graph");

        let mut shuffled = event_with_origins(count);
        let rotation = (seed % count as u64) as usize;
        shuffled.origins.rotate_left(rotation);
        let rotated = EventGraph::try_from(shuffled).expect("graph");

        let bytes = graph_to_bytes(&forward).expect("encode");
        prop_assert_eq!(&bytes, &graph_to_bytes(&rotated).expect("encode"));

        let reloaded = graph_from_bytes(&bytes).expect("decode");
        prop_assert_eq!(&bytes, &graph_to_bytes(&reloaded).expect("encode"));
    }
}

// =============================================================================
// BULLETIN PHASE TABLE
// =============================================================================

proptest! {
    /// Rows are ordered by distance; equal distances keep arrival order.
    #[test]
    fn phase_rows_sort_stably(distances in vec(prop::sample::select(vec![12.5, 30.0, 61.25]), 1..20)) {
        let mut event = Event::new("gfz2021gmyq");
        event.preferred_origin_id = Some(PublicId::new("origin/1"));
        event.origin_refs = vec![PublicId::new("origin/1")];
        let mut origin = Origin::new("origin/1", base_time(), -58.0, -7.9, 10.0);

        let mut graph = EventGraph::new(event);
        for (i, distance) in distances.iter().enumerate() {
            let pick_id = format!("pick/{i}");
            let time = base_time() + TimeDelta::seconds(60 + i as i64);
            graph.insert_pick(Pick::new(
                pick_id.as_str(),
                time,
                WaveformStreamId::new("GE", &format!("S{i:02}"), "", "BHZ"),
            ));
            origin.arrivals.push(Arrival {
                pick_id: PublicId::new(pick_id),
                phase: "P".to_string(),
                distance: *distance,
                azimuth: Some(90.0),
                time_residual: Some(0.5),
                weight: 1.0,
            });
        }
        graph.insert_origin(origin);

        let text = Bulletin::new(BulletinOptions::default())
            .format_event(&graph)
            .expect("bulletin");

        let mut expected: Vec<usize> = (0..distances.len()).collect();
        expected.sort_by(|a, b| distances[*a].total_cmp(&distances[*b]));

        let positions: Vec<usize> = expected
            .iter()
            .map(|i| text.find(&format!("\n    S{i:02}   GE ")).expect("row present"))
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}

// =============================================================================
// CUBE LINE
// =============================================================================

proptest! {
    /// The CUBE line is 80 columns and ends with its check character.
    #[test]
    fn cube_line_keeps_its_width(
        event_id in "[a-z0-9]{1,16}",
        latitude in -90.0f64..90.0,
        longitude in -180.0f64..180.0,
        depth in 0.0f64..700.0,
        magnitude in 0.0f64..9.9,
        millis in 0i64..1000,
        stations in optional_count(),
        phases in optional_count(),
        minimum_distance in prop::option::of(0.0f64..180.0),
        rms in prop::option::of(0.0f64..99.0),
        gap in prop::option::of(0.0f64..360.0),
        xerr in prop::option::of(0.0f64..999.0),
        zerr in prop::option::of(0.0f64..999.0),
        magnitude_stations in prop::option::of(0u32..500),
        network in "[A-Z]{0,3}",
    ) {
        let mut event = Event::new(event_id);
        event.preferred_origin_id = Some(PublicId::new("origin/1"));
        event.preferred_magnitude_id = Some(PublicId::new("mag/1"));
        event.origin_refs = vec![PublicId::new("origin/1")];

        let time = base_time() + TimeDelta::milliseconds(millis);
        let mut origin = Origin::new("origin/1", time, latitude, longitude, depth);
        if let Some(err) = zerr {
            origin.depth = RealQuantity::with_uncertainty(depth, err);
        }
        origin.quality = Some(OriginQuality {
            used_station_count: stations,
            used_phase_count: phases,
            minimum_distance,
            standard_error: rms,
            azimuthal_gap: gap,
            ..OriginQuality::default()
        });
        origin.uncertainty = Some(OriginUncertainty {
            max_horizontal_uncertainty: xerr,
            ..OriginUncertainty::default()
        });
        let mut mag = Magnitude::new("mag/1", "Mw", magnitude);
        mag.station_count = magnitude_stations;
        origin.magnitudes.push(mag);

        let mut graph = EventGraph::new(event);
        graph.insert_origin(origin);

        let options = CubeOptions {
            network_code: network,
            ..CubeOptions::default()
        };
        let line = cube_format(&graph, &options).expect("cube line");
        prop_assert_eq!(line.len(), 80);
        prop_assert!(line.starts_with("E "));
        prop_assert_eq!(line.chars().last(), Some(menlo_check_char(&line[..79])));
    }
}
