//! Moment tensor sheets of two reference events, resolved from a store.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use quakebook_core::{
    Axis, CreationInfo, EntityKind, Event, EventDescription, FocalMechanism, Magnitude,
    MemoryStore, MomentTensor, MomentTensorSheet, NodalPlane, NodalPlanes, Origin, OriginQuality,
    PrincipalAxes, PublicId, QuakeError, RegionLookup, ResolveOptions, Tensor, EventGraph, fm2txt,
    resolve,
};

const SOUTH_SANDWICH_SHEET: &str = concat!(
    "21/04/03 01:16:40.08\n",
    "East of South Sandwich Islands\n",
    "Epicenter: -58.05 -7.88\n",
    "MW 6.6\n",
    "\n",
    "GFZ MOMENT TENSOR SOLUTION\n",
    "Depth  18          No. of sta: 0\n",
    "Moment Tensor;   Scale 10**19 Nm\n",
    "  Mrr=-0.15       Mtt=-0.55\n",
    "  Mpp= 0.71       Mrt= 0.07\n",
    "  Mrp= 0.08       Mtp= 0.76\n",
    "Principal axes:\n",
    "  T  Val=  1.08  Plg= 4  Azm=295\n",
    "  N       -0.16      84       85\n",
    "  P       -0.92       2      205\n",
    "\n",
    "Best Double Couple:Mo=1.0*10**19\n",
    " NP1:Strike=340 Dip=84 Slip= 178\n",
    " NP2:        70     88         5\n",
    "           #----------           \n",
    "        ####-------------        \n",
    "     ########---------------     \n",
    "    ##########---------------    \n",
    "  ############-----------------  \n",
    "  ############-----------------  \n",
    " ##############---------------## \n",
    "##############-------------######\n",
    "##############----------#########\n",
    "#############---------###########\n",
    "###########----------############\n",
    "########------------#############\n",
    " ###----------------############ \n",
    "  ------------------###########  \n",
    "  ------------------###########  \n",
    "    -----------------########    \n",
    "     ----------------#######     \n",
    "        -------------####        \n",
    "           ----------#           \n",
);

const NEW_GUINEA_SHEET: &str = concat!(
    "11/01/26 08:01:30.02\n",
    "Eastern New Guinea Reg., P.N.G.\n",
    "Epicenter: -5.47 147.12\n",
    "MW 5.4\n",
    "\n",
    "GFZ MOMENT TENSOR SOLUTION\n",
    "Depth 216         No. of sta: 19\n",
    "Moment Tensor;   Scale 10**16 Nm\n",
    "  Mrr= 8.00       Mtt=-5.23\n",
    "  Mpp=-2.77       Mrt= 1.15\n",
    "  Mrp=-2.24       Mtp=-5.23\n",
    "Principal axes:\n",
    "  T  Val=  8.44  Plg=79  Azm= 88\n",
    "  N        1.31       8      310\n",
    "  P       -9.75       7      219\n",
    "\n",
    "Best Double Couple:Mo=9.2*10**16\n",
    " NP1:Strike=137 Dip=53 Slip= 100\n",
    " NP2:       300     38        77\n",
    "           -----------           \n",
    "        ----------------#        \n",
    "     ---------------########     \n",
    "    -------------############    \n",
    "  -------------################  \n",
    "  -----------##################  \n",
    " ----------##################### \n",
    "----------######################-\n",
    "---------#####################---\n",
    "--------#####################----\n",
    "-------#####################-----\n",
    "------####################-------\n",
    " ----###################-------- \n",
    "  ##################-----------  \n",
    "  ##############---------------  \n",
    "    #####--------------------    \n",
    "     ###--------------------     \n",
    "        -----------------        \n",
    "           -----------           \n",
);

// =============================================================================
// FIXTURES
// =============================================================================

struct Solution {
    time: DateTime<Utc>,
    region: &'static str,
    latitude: f64,
    longitude: f64,
    depth: f64,
    mw: f64,
    agency: Option<&'static str>,
    quality: Option<OriginQuality>,
    magnitude_station_count: Option<u32>,
    tensor: Tensor,
    axes: PrincipalAxes,
    moment: f64,
    planes: (NodalPlane, NodalPlane),
}

fn time(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, centis: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap() + TimeDelta::milliseconds(centis * 10)
}

fn south_sandwich() -> Solution {
    Solution {
        time: time(2021, 4, 3, 1, 16, 40, 8),
        region: "East of South Sandwich Islands",
        latitude: -58.0512,
        longitude: -7.8812,
        depth: 17.9,
        mw: 6.61,
        agency: Some("GFZ"),
        quality: Some(OriginQuality {
            used_station_count: Some(0),
            ..OriginQuality::default()
        }),
        magnitude_station_count: Some(52),
        tensor: Tensor {
            mrr: -1.512e18,
            mtt: -5.487e18,
            mpp: 7.113e18,
            mrt: 0.694e18,
            mrp: 0.812e18,
            mtp: 7.608e18,
        },
        axes: PrincipalAxes {
            t_axis: Axis::new(1.0813e19, 4.2, 295.3),
            n_axis: Axis::new(-0.1594e19, 84.1, 85.4),
            p_axis: Axis::new(-0.9219e19, 2.3, 205.1),
        },
        moment: 1.0213e19,
        planes: (
            NodalPlane::new(340.2, 84.3, 178.4),
            NodalPlane::new(70.1, 88.2, 5.3),
        ),
    }
}

/// Legacy event: the derived origin has no quality block.
fn new_guinea() -> Solution {
    Solution {
        time: time(2011, 1, 26, 8, 1, 30, 2),
        region: "Eastern New Guinea Reg., P.N.G.",
        latitude: -5.4688,
        longitude: 147.1213,
        depth: 215.8,
        mw: 5.43,
        agency: None,
        quality: None,
        magnitude_station_count: Some(19),
        tensor: Tensor {
            mrr: 8.0012e16,
            mtt: -5.2288e16,
            mpp: -2.7724e16,
            mrt: 1.1497e16,
            mrp: -2.2412e16,
            mtp: -5.2312e16,
        },
        axes: PrincipalAxes {
            t_axis: Axis::new(8.4412e16, 79.3, 88.2),
            n_axis: Axis::new(1.3088e16, 8.4, 310.6),
            p_axis: Axis::new(-9.7512e16, 7.2, 219.4),
        },
        moment: 9.2187e16,
        planes: (
            NodalPlane::new(137.3, 53.2, 100.4),
            NodalPlane::new(300.2, 38.6, 77.3),
        ),
    }
}

/// Event with a triggering origin, a derived origin owning the Mw and one
/// focal mechanism, split into store records.
fn store_for(solution: &Solution) -> MemoryStore {
    let mut store = MemoryStore::new();

    let mut event = Event::new("gfz/event");
    event.descriptions.push(EventDescription::region(solution.region));
    event.preferred_origin_id = Some(PublicId::new("gfz/origin/trig"));
    event.preferred_magnitude_id = Some(PublicId::new("gfz/magnitude/Mw"));
    event.preferred_focal_mechanism_id = Some(PublicId::new("gfz/fm"));
    event.origin_refs = vec![PublicId::new("gfz/origin/trig")];
    event.focal_mechanism_refs = vec![PublicId::new("gfz/fm")];
    store.insert_event(event);

    let mut triggering = Origin::new(
        "gfz/origin/trig",
        solution.time,
        solution.latitude,
        solution.longitude,
        10.0,
    );
    triggering.magnitudes.push(Magnitude::new("gfz/magnitude/mb", "mb", 6.2));
    store.insert_origin(triggering);

    let mut derived = Origin::new(
        "gfz/origin/mt",
        solution.time + TimeDelta::seconds(3),
        solution.latitude - 0.1,
        solution.longitude + 0.1,
        solution.depth,
    );
    derived.quality = solution.quality;
    let mut mw = Magnitude::new("gfz/magnitude/Mw", "Mw", solution.mw);
    mw.station_count = solution.magnitude_station_count;
    derived.magnitudes.push(mw);
    store.insert_origin(derived);

    let mut fm = FocalMechanism::new("gfz/fm");
    fm.triggering_origin_id = Some(PublicId::new("gfz/origin/trig"));
    fm.creation_info = solution.agency.map(CreationInfo::agency);
    fm.nodal_planes = Some(NodalPlanes {
        nodal_plane1: Some(solution.planes.0),
        nodal_plane2: Some(solution.planes.1),
        preferred_plane: None,
    });
    fm.principal_axes = Some(solution.axes);
    fm.moment_tensors.push(MomentTensor {
        public_id: PublicId::new("gfz/mt"),
        derived_origin_id: Some(PublicId::new("gfz/origin/mt")),
        moment_magnitude_id: Some(PublicId::new("gfz/magnitude/Mw")),
        scalar_moment: Some(solution.moment),
        tensor: Some(solution.tensor),
        greens_function_id: Some("gemini-prem".to_string()),
        ..MomentTensor::default()
    });
    store.insert_focal_mechanism(fm);
    store
}

fn resolved(solution: &Solution) -> EventGraph {
    resolve(
        &store_for(solution),
        &PublicId::new("gfz/event"),
        &ResolveOptions::default(),
    )
    .unwrap()
}

// =============================================================================
// REFERENCE SHEETS
// =============================================================================

#[test]
fn test_sheet_matches_reference() {
    let graph = resolved(&south_sandwich());
    let fm = graph.preferred_focal_mechanism().unwrap();
    let text = fm2txt(&graph, fm).unwrap();
    assert_eq!(text.len(), 1122);
    assert_eq!(text, SOUTH_SANDWICH_SHEET);
}

#[test]
fn test_legacy_sheet_takes_station_count_from_magnitude() {
    let graph = resolved(&new_guinea());
    let fm = graph.preferred_focal_mechanism().unwrap();
    let text = fm2txt(&graph, fm).unwrap();
    assert_eq!(text.len(), 1123);
    assert_eq!(text, NEW_GUINEA_SHEET);
}

#[test]
fn test_sheet_is_stable_across_renders() {
    let graph = resolved(&south_sandwich());
    let fm = graph.preferred_focal_mechanism().unwrap();
    assert_eq!(fm2txt(&graph, fm).unwrap(), fm2txt(&graph, fm).unwrap());
}

#[test]
fn test_station_count_defaults_to_minus_one() {
    let mut solution = new_guinea();
    solution.magnitude_station_count = None;
    let graph = resolved(&solution);
    let fm = graph.preferred_focal_mechanism().unwrap();
    let text = fm2txt(&graph, fm).unwrap();
    assert!(text.contains("Depth 216         No. of sta: -1\n"));
}

// =============================================================================
// REGION LOOKUP & AGENCY
// =============================================================================

struct FixedRegion;

impl RegionLookup for FixedRegion {
    fn region_name(&self, _graph: &EventGraph, latitude: f64, longitude: f64) -> Option<String> {
        Some(format!("Region at {:.1} {:.1}", latitude, longitude))
    }
}

#[test]
fn test_region_lookup_receives_triggering_epicenter() {
    let graph = resolved(&new_guinea());
    let fm = graph.preferred_focal_mechanism().unwrap();
    let text = MomentTensorSheet::new()
        .with_regions(FixedRegion)
        .with_fallback_agency("GEOFON")
        .render(&graph, fm)
        .unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "Region at -5.5 147.1");
    assert_eq!(lines[5], "GEOFON MOMENT TENSOR SOLUTION");
}

#[test]
fn test_contributions_are_stripped_by_default() {
    let graph = resolved(&south_sandwich());
    let mt = graph
        .preferred_focal_mechanism()
        .and_then(FocalMechanism::moment_tensor)
        .unwrap();
    assert_eq!(mt.greens_function_id, None);

    let options = ResolveOptions {
        include_moment_tensor_contributions: true,
        ..ResolveOptions::default()
    };
    let full = resolve(
        &store_for(&south_sandwich()),
        &PublicId::new("gfz/event"),
        &options,
    )
    .unwrap();
    let mt = full
        .preferred_focal_mechanism()
        .and_then(FocalMechanism::moment_tensor)
        .unwrap();
    assert_eq!(mt.greens_function_id.as_deref(), Some("gemini-prem"));
}

// =============================================================================
// PRECONDITIONS
// =============================================================================

#[test]
fn test_missing_derived_origin_is_not_found() {
    let mut store = store_for(&south_sandwich());
    store.remove_origin(&PublicId::new("gfz/origin/mt"));
    let graph = resolve(
        &store,
        &PublicId::new("gfz/event"),
        &ResolveOptions::default(),
    )
    .unwrap();
    assert!(
        graph
            .diagnostics()
            .iter()
            .any(|d| d.kind == EntityKind::Origin && d.id.as_str() == "gfz/origin/mt")
    );

    let fm = graph.preferred_focal_mechanism().unwrap();
    assert!(matches!(
        fm2txt(&graph, fm),
        Err(QuakeError::NotFound { .. })
    ));
}

#[test]
fn test_missing_tensor_is_invalid_format() {
    let graph = resolved(&south_sandwich());
    let mut fm = graph.preferred_focal_mechanism().unwrap().clone();
    if let Some(mt) = fm.moment_tensors.first_mut() {
        mt.tensor = None;
    }
    assert!(matches!(
        fm2txt(&graph, &fm),
        Err(QuakeError::InvalidFormat(_))
    ));
}
