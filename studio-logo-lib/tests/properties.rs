//! Property tests for the colour engine.
//!
//! Host only; proptest does not build for the ESP-IDF target.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use studio_logo_lib::palette::{MAIN_SECTIONS, RING_ORDER, STRIP_LEN};
use studio_logo_lib::power::{estimate_milliwatts, max_brightness};
use studio_logo_lib::render::scale;
use studio_logo_lib::rotation::next_assignment;
use studio_logo_lib::testing::MemoryStore;
use studio_logo_lib::transition::Tween;
use studio_logo_lib::{Palette, Persistence, PowerBudget, SectionColorMap, SectionStore, Transition, RGB8};

fn palette() -> Palette {
    Palette::studio_logo().unwrap()
}

fn arb_rgb() -> impl Strategy<Value = RGB8> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| RGB8::new(r, g, b))
}

/// Any assignment of ring colours to the five main sections, ears included.
fn arb_ring_assignment() -> impl Strategy<Value = SectionColorMap> {
    proptest::collection::vec(0..RING_ORDER.len(), MAIN_SECTIONS.len()).prop_map(|indices| {
        let mut map: SectionColorMap = MAIN_SECTIONS
            .iter()
            .zip(indices)
            .map(|(section, i)| ((*section).to_string(), RING_ORDER[i].to_string()))
            .collect();
        map.insert("leftEar".to_string(), "orange".to_string());
        map.insert("rightEar".to_string(), "lighterGreen".to_string());
        map
    })
}

fn arb_color_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "blue",
        "green",
        "lighterGreen",
        "yellow",
        "red",
        "orange",
        "purple",
        "white",
    ])
    .prop_map(str::to_string)
}

// ── Brightness scaling ──────────────────────────────────────────

proptest! {
    #[test]
    fn scale_is_bounded(color in arb_rgb(), factor in 0.0f32..=1.0f32) {
        let scaled = scale(color, factor);
        prop_assert!(scaled.r <= color.r);
        prop_assert!(scaled.g <= color.g);
        prop_assert!(scaled.b <= color.b);
    }

    #[test]
    fn scale_endpoints(color in arb_rgb()) {
        prop_assert_eq!(scale(color, 1.0), color);
        prop_assert_eq!(scale(color, 0.0), RGB8::default());
    }
}

// ── Rotation ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn clockwise_then_anti_clockwise_is_identity(current in arb_ring_assignment()) {
        let p = palette();
        let forward = next_assignment(&p, &current, false);
        let back = next_assignment(&p, &forward.assignment, true);
        prop_assert!(forward.skipped.is_empty());
        prop_assert_eq!(back.assignment, current);
    }

    #[test]
    fn full_cycle_is_identity(current in arb_ring_assignment(), anti_clockwise in any::<bool>()) {
        let p = palette();
        let mut map = current.clone();
        for _ in 0..RING_ORDER.len() {
            map = next_assignment(&p, &map, anti_clockwise).assignment;
        }
        prop_assert_eq!(map, current);
    }
}

// ── Transitions ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn tween_starts_at_start_and_ends_at_end(
        start in arb_rgb(),
        end in arb_rgb(),
        duration in 1u64..=2_000,
        overshoot in 0u64..=1_000,
    ) {
        let p = palette();
        let transitions = vec![Transition {
            section: "leftEar".to_string(),
            start,
            end,
        }];
        let tween = Tween::new(&transitions, duration);
        let mut pixels = vec![RGB8::default(); STRIP_LEN];

        // leftEar is at full brightness, so pixels carry the raw colours
        prop_assert!(!tween.frame(&p, &mut pixels, 0));
        prop_assert_eq!(pixels[34], start);

        prop_assert!(tween.frame(&p, &mut pixels, duration + overshoot));
        prop_assert_eq!(pixels[34], end);
        prop_assert_eq!(pixels[35], end);
    }
}

// ── Persistence ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn persist_clear_hydrate_roundtrip(colors in proptest::collection::vec(arb_color_name(), 7)) {
        let p = palette();
        let map: SectionColorMap = p
            .section_names()
            .map(str::to_string)
            .zip(colors)
            .collect();

        let mut persistence = Persistence::new(MemoryStore::new());
        persistence.save_sections(&map).unwrap();

        let mut sections = SectionStore::new();
        let outcome = persistence.hydrate(&p, &mut sections);

        prop_assert_eq!(outcome.restored, 7);
        prop_assert_eq!(sections.as_map(), &map);
    }
}

// ── Power limiting ──────────────────────────────────────────────

proptest! {
    #[test]
    fn power_limit_never_raises_and_stays_in_budget(
        pixels in proptest::collection::vec(arb_rgb(), 0..=64),
        target in any::<u8>(),
        milliamps in 0u32..=3_000,
    ) {
        let budget = PowerBudget::new(5, milliamps);
        let brightness = max_brightness(&pixels, target, budget);
        prop_assert!(brightness <= target);

        let drawn = u64::from(estimate_milliwatts(&pixels)) * u64::from(brightness) / 256;
        prop_assert!(drawn <= u64::from(budget.max_milliwatts()));
    }
}
