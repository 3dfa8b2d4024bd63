//! Property tests for track layout invariants.
//!
//! Random edit sequences must always leave a track contiguous, starting at
//! frame 0, with merged blanks and no trailing blank.

use cutlist_core::FrameRate;
use cutlist_playlist::{Playlist, Producer};
use cutlist_timeline::{ClipState, InsertMode, Track, TrackKind};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Add { at: u32, length: u32, mode: u8 },
    Delete { at: u32 },
    DeleteSpan { at: u32, length: u32 },
    Move { from: u32, to: u32 },
    Resize { at: u32, delta: i32, from_end: bool },
    Cut { at: u32 },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0u32..400, 1u32..120, 0u8..3).prop_map(|(at, length, mode)| Edit::Add { at, length, mode }),
        (0u32..400).prop_map(|at| Edit::Delete { at }),
        (0u32..400, 1u32..80).prop_map(|(at, length)| Edit::DeleteSpan { at, length }),
        (0u32..400, 0u32..400).prop_map(|(from, to)| Edit::Move { from, to }),
        (0u32..400, -60i32..60, any::<bool>())
            .prop_map(|(at, delta, from_end)| Edit::Resize { at, delta, from_end }),
        (0u32..400).prop_map(|at| Edit::Cut { at }),
    ]
}

fn seconds(frames: impl Into<f64>) -> f64 {
    frames.into() / 25.0
}

fn apply(track: &Track, source: &Producer, edit: &Edit) {
    // Failures are legitimate outcomes; only the layout matters here.
    let _ = match *edit {
        Edit::Add { at, length, mode } => {
            let mode = match mode {
                0 => InsertMode::Insert,
                1 => InsertMode::Overwrite,
                _ => InsertMode::SplitInsert,
            };
            track.add(seconds(at), source, 0.0, seconds(length), ClipState::Original, false, mode)
        }
        Edit::Delete { at } => track.delete(seconds(at)),
        Edit::DeleteSpan { at, length } => track.delete_span(seconds(at), seconds(length)),
        Edit::Move { from, to } => track.move_clip(seconds(from), seconds(to), InsertMode::Insert),
        Edit::Resize { at, delta, from_end } => track.resize(seconds(at), seconds(delta), from_end),
        Edit::Cut { at } => track.cut(seconds(at)),
    };
}

fn check_layout(track: &Track) -> Result<(), TestCaseError> {
    let regions = track.regions();
    let mut expected_start = 0;
    for region in &regions {
        prop_assert_eq!(region.start, expected_start);
        prop_assert!(region.length > 0, "empty region {:?}", region);
        expected_start = region.end();
    }
    prop_assert_eq!(track.playtime(), expected_start);
    for pair in regions.windows(2) {
        prop_assert!(!(pair[0].is_blank() && pair[1].is_blank()), "adjacent blanks");
    }
    if let Some(last) = regions.last() {
        prop_assert!(!last.is_blank(), "trailing blank");
    }
    Ok(())
}

proptest! {
    #[test]
    fn edits_keep_regions_contiguous(edits in prop::collection::vec(edit(), 1..40)) {
        let track = Track::new(Playlist::with_id("playlist1").shared(), TrackKind::Video, FrameRate::FPS_25);
        let source = Producer::new("color", "red", 15000);
        source.set("id", "1");
        for edit in &edits {
            apply(&track, &source, edit);
            check_layout(&track)?;
        }
    }

    #[test]
    fn delete_then_readd_restores_playtime(start in 0u32..200, length in 1u32..100, tail in 0u32..100) {
        let track = Track::new(Playlist::with_id("playlist1").shared(), TrackKind::Video, FrameRate::FPS_25);
        let source = Producer::new("color", "red", 15000);
        apply(&track, &source, &Edit::Add { at: start, length, mode: 0 });
        apply(&track, &source, &Edit::Add { at: start + length + tail, length: 10, mode: 0 });
        let playtime = track.playtime();

        prop_assert!(track.delete(seconds(start)).is_ok());
        apply(&track, &source, &Edit::Add { at: start, length, mode: 0 });
        prop_assert_eq!(track.playtime(), playtime);
        check_layout(&track)?;
    }
}
