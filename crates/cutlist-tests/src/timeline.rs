//! Integration tests for the timeline subsystem.
//!
//! Exercises cross-crate interactions between cutlist-core,
//! cutlist-playlist, and cutlist-timeline.

use cutlist_core::{logging, FrameRate, RationalTime, TrackSettings};
use cutlist_playlist::{Filter, MediaFactory, Producer, ProducerFactory, Properties};
use cutlist_timeline::{
    ChannelEvents, ClipState, InsertMode, ItemInfo, TimelineFile, Timeline, TrackEvent, TrackKind,
};
use std::collections::HashMap;
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────

fn factory() -> Arc<MediaFactory> {
    let factory = MediaFactory::new();
    factory.register("interview.mp4", 1500);
    factory.register("broll.mp4", 750);
    factory.register("interview_graded.mp4", 1500);
    Arc::new(factory)
}

fn media(factory: &MediaFactory, resource: &str, id: &str) -> Producer {
    let producer = factory.create(&format!("avformat:{}", resource));
    producer.set("id", id);
    producer
}

fn build_timeline() -> (Timeline, HashMap<String, Producer>, crossbeam_channel::Receiver<TrackEvent>) {
    logging::try_init_for_tests();
    let factory = factory();
    let interview = media(&factory, "interview.mp4", "1");
    let broll = media(&factory, "broll.mp4", "2");
    let title = Producer::new("color", "black", 15000);
    title.set("id", "3");

    let (events, receiver) = ChannelEvents::unbounded();
    let mut timeline = Timeline::new("Documentary", FrameRate::FPS_25)
        .with_factory(factory)
        .with_events(Arc::new(events));
    timeline.add_track(TrackKind::Video, "V1");
    timeline.add_track(TrackKind::Video, "V2");
    timeline.add_track(TrackKind::Audio, "A1");

    let v1 = timeline.track(0).unwrap();
    v1.add(0.0, &title, 0.0, 2.0, ClipState::Original, true, InsertMode::Insert)
        .unwrap();
    v1.add(2.0, &interview, 10.0, 20.0, ClipState::Original, true, InsertMode::Insert)
        .unwrap();
    v1.add(12.0, &interview, 30.0, 35.0, ClipState::Original, true, InsertMode::Insert)
        .unwrap();
    timeline
        .track(1)
        .unwrap()
        .add(4.0, &broll, 0.0, 4.0, ClipState::VideoOnly, true, InsertMode::Insert)
        .unwrap();
    timeline
        .track(2)
        .unwrap()
        .add(2.0, &interview, 10.0, 20.0, ClipState::AudioOnly, true, InsertMode::Insert)
        .unwrap();

    let producers = [interview, broll, title]
        .into_iter()
        .map(|p| (p.id(), p))
        .collect();
    (timeline, producers, receiver)
}

fn assert_contiguous(timeline: &Timeline) {
    for track in timeline.tracks() {
        let regions = track.regions();
        for pair in regions.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start);
        }
        if let Some(first) = regions.first() {
            assert_eq!(first.start, 0);
        }
    }
}

// ── Timeline assembly & timing ─────────────────────────────────

#[test]
fn timeline_duration_is_max_of_tracks() {
    let (timeline, _, _) = build_timeline();
    assert_eq!(timeline.playtime(), 425);
    assert_eq!(timeline.duration(), RationalTime::new(17, 1));
    assert_contiguous(&timeline);
}

#[test]
fn interview_is_duplicated_per_track() {
    let (timeline, producers, _) = build_timeline();
    let v1 = timeline.track(0).unwrap().regions();
    let a1 = timeline.track(2).unwrap().regions();

    let video_parent = v1[1].clip.as_ref().unwrap().parent();
    let second_parent = v1[2].clip.as_ref().unwrap().parent();
    let audio_parent = a1[1].clip.as_ref().unwrap().parent();

    assert_eq!(video_parent.id(), "1_playlist1");
    assert!(second_parent.same_as(&video_parent));
    assert_eq!(audio_parent.id(), "1_playlist3_audio");
    assert!(!audio_parent.same_as(&producers["1"]));

    // Video-only use shares the project producer.
    let v2 = timeline.track(1).unwrap().regions();
    assert!(v2[1].clip.as_ref().unwrap().parent().same_as(&producers["2"]));
}

// ── Duration notifications ─────────────────────────────────────

#[test]
fn edit_session_reports_each_net_change() {
    let (timeline, producers, receiver) = build_timeline();
    receiver.try_iter().count();
    let v1 = timeline.track(0).unwrap();

    // Trailing clip removed: 425 -> 300.
    v1.delete(12.0).unwrap();
    // Interior edits keep the length.
    v1.cut(5.0).unwrap();
    v1.resize(0.0, -0.4, true).unwrap();
    // Put the clip back.
    v1.add(12.0, &producers["1"], 30.0, 35.0, ClipState::Original, true, InsertMode::Insert)
        .unwrap();

    let durations: Vec<i64> = receiver
        .try_iter()
        .filter_map(|event| match event {
            TrackEvent::DurationChanged(playtime) => Some(playtime),
            _ => None,
        })
        .collect();
    assert_eq!(durations, vec![300, 425]);
    assert_contiguous(&timeline);
}

// ── Producer replacement ───────────────────────────────────────

#[test]
fn replacing_a_source_updates_every_track() {
    let (timeline, _, _) = build_timeline();
    let factory = factory();
    let relinked = media(&factory, "interview_graded.mp4", "1");

    assert_eq!(timeline.replace_producer("1", &relinked, None), 2);

    let v1 = timeline.track(0).unwrap().regions();
    let video = v1[1].clip.as_ref().unwrap();
    assert_eq!(video.parent().resource(), "interview_graded.mp4");
    assert_eq!(video.parent().id(), "1_playlist1");
    assert_eq!((video.get_in(), video.get_out()), (250, 499));

    let a1 = timeline.track(2).unwrap().regions();
    let audio = a1[1].clip.as_ref().unwrap().parent();
    assert_eq!(audio.id(), "1_playlist3_audio");
    assert_eq!(audio.resource(), "interview_graded.mp4");
    assert_eq!(audio.get_int("video_index"), -1);
    assert_eq!(timeline.playtime(), 425);
    assert_contiguous(&timeline);
}

#[test]
fn effects_follow_the_source_to_duplicates() {
    let (timeline, producers, _) = build_timeline();
    producers["1"].attach(Filter::effect("lift_gamma_gain", "lift_gamma_gain"));
    timeline.update_effects("1", &producers["1"]);

    for (track, index) in [(0, 1), (0, 2), (2, 1)] {
        let regions = timeline.track(track).unwrap().regions();
        let parent = regions[index].clip.as_ref().unwrap().parent();
        assert_eq!(parent.filter_count(), 1, "track {} region {}", track, index);
    }
}

// ── Slow motion ────────────────────────────────────────────────

#[test]
fn slowmotion_producers_are_pooled_and_marked() {
    let (mut timeline, _, receiver) = build_timeline();
    receiver.try_iter().count();

    // Interview on V1 spans frames [50, 300), followed by a clip at 300.
    let info = ItemInfo::from_frames(50, 250, 250, FrameRate::FPS_25);
    let length = timeline
        .change_clip_speed(0, &info, &info, 0.5, 1, &Properties::new())
        .unwrap();
    // Twice as long, but only the blank up to the next clip is available.
    assert_eq!(length, 250);
    assert_eq!(timeline.slowmotion().len(), 1);

    let created: Vec<String> = receiver
        .try_iter()
        .filter_map(|event| match event {
            TrackEvent::SlowMotionCreated { url, .. } => Some(url),
            _ => None,
        })
        .collect();
    assert_eq!(created, vec!["interview.mp4?0.5".to_string()]);

    let slow = timeline.track(0).unwrap().regions()[1]
        .clip
        .clone()
        .unwrap()
        .parent();
    assert_eq!(slow.id(), "slowmotion:1:0.5");

    // A second clip at the same speed reuses the pooled producer.
    let a1_info = ItemInfo::from_frames(50, 250, 250, FrameRate::FPS_25);
    timeline
        .change_clip_speed(2, &a1_info, &a1_info, 0.5, 1, &Properties::new())
        .unwrap();
    assert_eq!(timeline.slowmotion().len(), 1);
    assert_eq!(timeline.track(2).unwrap().playtime(), 550);

    assert_eq!(timeline.track(0).unwrap().slowmotion_ids("1"), Vec::<String>::new());
    for track in timeline.tracks() {
        track.replace_id("1");
    }
    assert_eq!(timeline.track(0).unwrap().slowmotion_ids("1"), vec!["0.5".to_string()]);
    assert_contiguous(&timeline);
}

#[test]
fn locale_separator_reaches_identifiers() {
    logging::try_init_for_tests();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let settings = TrackSettings {
        decimal_separator: ',',
        ..TrackSettings::default()
    };
    settings.save_to_file(&path).unwrap();
    let settings = TrackSettings::load_from_file(&path).unwrap();

    let factory = factory();
    let interview = media(&factory, "interview.mp4", "1");
    let mut timeline = Timeline::from_settings("Locale", settings).with_factory(factory);
    timeline.add_track(TrackKind::Video, "V1");
    timeline
        .track(0)
        .unwrap()
        .add(0.0, &interview, 0.0, 4.0, ClipState::Original, true, InsertMode::Insert)
        .unwrap();

    let info = ItemInfo::from_frames(0, 0, 100, FrameRate::FPS_25);
    let length = timeline
        .change_clip_speed(0, &info, &info, 0.25, 1, &Properties::new())
        .unwrap();
    assert_eq!(length, 400);
    let parent = timeline.track(0).unwrap().regions()[0]
        .clip
        .clone()
        .unwrap()
        .parent();
    assert_eq!(parent.id(), "slowmotion:1:0,25");
    assert_eq!(parent.resource(), "interview.mp4?0,25");
}

// ── Serialization roundtrip ────────────────────────────────────

#[test]
fn edited_timeline_survives_file_roundtrip() {
    let (timeline, producers, _) = build_timeline();
    let v1 = timeline.track(0).unwrap();
    v1.move_clip(12.0, 14.0, InsertMode::Insert).unwrap();
    v1.delete_span(0.0, 1.0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("documentary.json");
    TimelineFile::from_timeline(&timeline)
        .unwrap()
        .save_to_file(&path)
        .unwrap();

    let restored = TimelineFile::load_from_file(&path)
        .unwrap()
        .restore(&producers)
        .unwrap();
    assert_eq!(restored.track_count(), 3);
    assert_eq!(restored.playtime(), timeline.playtime());
    for (before, after) in timeline.tracks().iter().zip(restored.tracks()) {
        let layout = |track: &cutlist_timeline::Track| {
            track
                .regions()
                .iter()
                .map(|r| (r.start, r.length, r.is_blank()))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(before), layout(after));
        assert_eq!(before.info(), after.info());
    }
    assert_contiguous(&restored);
}
