//! End-to-end linker scenarios: translation, disappearance, mitosis,
//! gating, and the failure-atomicity guarantees of the frame step.

use lap_linker::assignment::SolverKind;
use lap_linker::detection::{AttributeValue, Detection};
use lap_linker::errors::LinkerError;
use lap_linker::linker::Linker;
use lap_linker::options::LinkerOptions;
use lap_linker::scoring::ScoreKind;

fn centroid(x: f64, y: f64) -> Detection {
    Detection::new().with_vector("centroid", vec![x, y])
}

fn pixels(indices: &[u64]) -> Detection {
    Detection::new().with_pixels("pixels", indices.to_vec())
}

fn centroid_of(detection: &Detection) -> &[f64] {
    match detection.get("centroid") {
        Some(AttributeValue::Vector(values)) => values,
        _ => panic!("expected a centroid vector"),
    }
}

fn pixel_options() -> LinkerOptions {
    let mut options = LinkerOptions::default();
    options.linked_by = "pixels".to_owned();
    options.link_calc = ScoreKind::PixelIntersect;
    options.linking_score_range = (0.0, 10.0);
    options.track_mitosis = true;
    options
}

#[test]
fn test_two_objects_pure_translation() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0), centroid(10.0, 10.0)]).unwrap();
    linker.assign_to_frame(2, &[centroid(1.0, 1.0), centroid(11.0, 11.0)]).unwrap();

    let store = linker.into_store();
    assert_eq!(store.len(), 2);
    for (id, start, end) in [(1, [0.0, 0.0], [1.0, 1.0]), (2, [10.0, 10.0], [11.0, 11.0])] {
        let track = store.get(id).unwrap();
        assert_eq!(track.first_frame(), Some(1));
        assert_eq!(track.last_frame(), Some(2));
        assert_eq!(centroid_of(track.data_at_frame(1).unwrap()), start);
        assert_eq!(centroid_of(track.data_at_frame(2).unwrap()), end);
    }
}

#[test]
fn test_object_disappears_and_its_track_retires() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0), centroid(10.0, 10.0)]).unwrap();
    linker.assign_to_frame(2, &[centroid(1.0, 1.0)]).unwrap();
    assert_eq!(linker.active_tracks().collect::<Vec<_>>(), vec![1, 2]);

    linker.assign_to_frame(3, &[centroid(1.0, 1.0)]).unwrap();
    assert_eq!(linker.active_tracks().collect::<Vec<_>>(), vec![1]);

    // The retired track stays in the store, frozen at its last frame.
    let store = linker.into_store();
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(2).unwrap().last_frame(), Some(1));
    assert_eq!(store.get(1).unwrap().last_frame(), Some(3));
}

#[test]
fn test_mitosis_via_pixel_overlap() {
    let mut linker = Linker::new(pixel_options()).unwrap();
    linker.assign_to_frame(1, &[pixels(&[1, 2, 3, 4])]).unwrap();
    linker.assign_to_frame(2, &[pixels(&[1, 2])]).unwrap();
    linker.assign_to_frame(3, &[pixels(&[1, 2]), pixels(&[3, 4])]).unwrap();

    let store = linker.into_store();
    assert_eq!(store.len(), 3);

    // The parent is retracted to its pre-division history.
    let parent = store.get(1).unwrap();
    assert_eq!(parent.first_frame(), Some(1));
    assert_eq!(parent.last_frame(), Some(2));
    assert_eq!(parent.daughter_ids(), Some((2, 3)));

    for id in [2, 3] {
        let daughter = store.get(id).unwrap();
        assert_eq!(daughter.mother_id(), Some(1));
        assert_eq!(daughter.first_frame(), Some(3));
    }
    assert_eq!(
        store.get(2).unwrap().last_data().unwrap().get("pixels"),
        Some(&AttributeValue::Pixels(vec![1, 2]))
    );
    assert_eq!(
        store.get(3).unwrap().last_data().unwrap().get("pixels"),
        Some(&AttributeValue::Pixels(vec![3, 4]))
    );
}

#[test]
fn test_divided_parent_leaves_the_active_set() {
    let mut linker = Linker::new(pixel_options()).unwrap();
    linker.assign_to_frame(1, &[pixels(&[1, 2, 3, 4])]).unwrap();
    linker.assign_to_frame(2, &[pixels(&[1, 2])]).unwrap();
    linker.assign_to_frame(3, &[pixels(&[1, 2]), pixels(&[3, 4])]).unwrap();
    assert_eq!(linker.active_tracks().collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn test_fresh_daughters_do_not_divide_again_immediately() {
    let mut linker = Linker::new(pixel_options()).unwrap();
    linker.assign_to_frame(1, &[pixels(&[1, 2, 3, 4])]).unwrap();
    linker.assign_to_frame(2, &[pixels(&[1, 2])]).unwrap();
    linker.assign_to_frame(3, &[pixels(&[1, 2]), pixels(&[3, 4])]).unwrap();
    // Daughter 2 keeps {1,2}; the extra {2} overlaps it but the daughter
    // is younger than min_age_since_mitosis.
    linker.assign_to_frame(4, &[pixels(&[1, 2]), pixels(&[3, 4]), pixels(&[2])]).unwrap();

    let store = linker.snapshot();
    assert_eq!(store.get(2).unwrap().daughter_ids(), None);
    assert_eq!(store.get(3).unwrap().daughter_ids(), None);
    // The unclaimed detection opened a standalone track instead.
    assert_eq!(store.len(), 4);
    assert_eq!(store.get(4).unwrap().mother_id(), None);
}

#[test]
fn test_gating_drops_far_detections() {
    let mut options = LinkerOptions::default();
    options.linking_score_range = (0.0, 50.0);
    let mut linker = Linker::new(options).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0)]).unwrap();
    linker.assign_to_frame(2, &[centroid(1000.0, 1000.0)]).unwrap();

    // The old track aged by one but survives; the far detection opened a
    // new track.
    assert_eq!(linker.active_tracks().collect::<Vec<_>>(), vec![1, 2]);
    let store = linker.into_store();
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(1).unwrap().last_frame(), Some(1));
    assert_eq!(store.get(2).unwrap().first_frame(), Some(2));
}

#[test]
fn test_empty_frame_only_ages_the_active_set() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0), centroid(10.0, 10.0)]).unwrap();
    linker.assign_to_frame(2, &[]).unwrap();
    assert_eq!(linker.active_tracks().count(), 2);
    linker.assign_to_frame(3, &[]).unwrap();
    assert_eq!(linker.active_tracks().count(), 0);
    assert_eq!(linker.snapshot().len(), 2);
}

#[test]
fn test_skipped_frames_pad_with_null_records() {
    let mut options = LinkerOptions::default();
    options.max_track_age = 5;
    let mut linker = Linker::new(options).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0)]).unwrap();
    linker.assign_to_frame(4, &[centroid(1.0, 1.0)]).unwrap();

    let store = linker.into_store();
    let track = store.get(1).unwrap();
    assert_eq!(track.num_frames(), 4);
    assert!(track.data_at_frame(2).is_none());
    assert!(track.data_at_frame(3).is_none());
    assert!(track.data_at_frame(4).is_some());
}

#[test]
fn test_no_new_tracks_suppresses_standalone_tracks() {
    let mut options = LinkerOptions::default();
    options.linking_score_range = (0.0, 50.0);
    let mut linker = Linker::new(options).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0)]).unwrap();
    linker.assign_to_frame_manual(2, &[centroid(1.0, 1.0), centroid(500.0, 500.0)], true).unwrap();

    let store = linker.into_store();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(1).unwrap().last_frame(), Some(2));
}

#[test]
fn test_frame_index_must_advance() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    assert_eq!(linker.assign_to_frame(0, &[]), Err(LinkerError::ZeroFrameIndex));
    linker.assign_to_frame(2, &[centroid(0.0, 0.0)]).unwrap();
    assert_eq!(
        linker.assign_to_frame(2, &[centroid(1.0, 1.0)]),
        Err(LinkerError::NonMonotonicFrame { frame: 2, last: 2 })
    );
    assert_eq!(
        linker.assign_to_frame(1, &[centroid(1.0, 1.0)]),
        Err(LinkerError::NonMonotonicFrame { frame: 1, last: 2 })
    );
}

#[test]
fn test_missing_link_attribute_fails_without_mutating() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0)]).unwrap();

    let bogus = Detection::new().with_scalar("area", 1.0);
    let error = linker.assign_to_frame(2, &[bogus]).unwrap_err();
    assert_eq!(error, LinkerError::MissingAttribute { index: 0, attribute: "centroid".to_owned() });

    // The failed frame left no trace; the same frame index can be
    // resubmitted with corrected detections.
    assert_eq!(linker.snapshot().get(1).unwrap().last_frame(), Some(1));
    linker.assign_to_frame(2, &[centroid(0.5, 0.5)]).unwrap();
    assert_eq!(linker.snapshot().get(1).unwrap().last_frame(), Some(2));
}

#[test]
fn test_mismatched_centroid_lengths_are_an_error() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    linker.assign_to_frame(1, &[centroid(0.0, 0.0)]).unwrap();
    let flat = Detection::new().with_vector("centroid", vec![1.0]);
    assert!(matches!(
        linker.assign_to_frame(2, &[flat]),
        Err(LinkerError::Scoring(_))
    ));
}

#[test]
fn test_munkres_backend_links_identically() {
    for solver in [SolverKind::Jv, SolverKind::Munkres] {
        let mut options = LinkerOptions::default();
        options.lap_solver = solver;
        let mut linker = Linker::new(options).unwrap();
        linker.assign_to_frame(1, &[centroid(0.0, 0.0), centroid(10.0, 10.0)]).unwrap();
        linker.assign_to_frame(2, &[centroid(1.0, 1.0), centroid(11.0, 11.0)]).unwrap();

        let store = linker.into_store();
        assert_eq!(centroid_of(store.get(1).unwrap().last_data().unwrap()), [1.0, 1.0]);
        assert_eq!(centroid_of(store.get(2).unwrap().last_data().unwrap()), [11.0, 11.0]);
    }
}

#[test]
fn test_track_ids_are_never_reused() {
    let mut options = LinkerOptions::default();
    options.max_track_age = 1;
    options.linking_score_range = (0.0, 5.0);
    let mut linker = Linker::new(options).unwrap();
    // Each frame is far from the previous one, so every frame retires
    // the old track and opens a fresh id.
    linker.assign_to_frame(1, &[centroid(0.0, 0.0)]).unwrap();
    linker.assign_to_frame(2, &[centroid(100.0, 0.0)]).unwrap();
    linker.assign_to_frame(3, &[centroid(200.0, 0.0)]).unwrap();

    let store = linker.into_store();
    assert_eq!(store.len(), 3);
    let ids: Vec<_> = store.iter().map(lap_linker::store::Track::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_metadata_pass_through() {
    let mut linker = Linker::new(LinkerOptions::default()).unwrap();
    linker.set_filename("experiment_42.nd2");
    linker.set_pixel_size(0.65, "um");
    linker.set_timestamp_info(vec![0.0, 5.0], "min");
    linker.set_image_size(1024, 1344);

    let store = linker.into_store();
    assert_eq!(store.metadata().filename(), Some("experiment_42.nd2"));
    assert_eq!(store.metadata().pixel_size().unwrap().value, 0.65);
    assert_eq!(store.metadata().timestamps().unwrap().1, "min");
    assert_eq!(store.metadata().image_size(), Some((1024, 1344)));
}
