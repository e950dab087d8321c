use notedrill_domain_eval::{MelodicEngine, PhraseContext};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

const PENTATONIC: [u8; 6] = [60, 62, 64, 67, 69, 72];

fn ctx<'a>(active_notes: &'a [u8], scale_preset: &'a str) -> PhraseContext<'a> {
    PhraseContext {
        active_notes,
        scale_preset,
    }
}

#[test]
fn chord_pool_follows_preset_progression() {
    let mut engine = MelodicEngine::new();
    engine.rebuild_chord_pool(&ctx(&PENTATONIC, "c-major-pent"));
    assert_eq!(
        engine.chord_pool(),
        &[vec![60, 64, 67], vec![62, 67, 69], vec![64, 69, 72]]
    );
}

#[test]
fn chords_with_fewer_than_two_active_tones_are_dropped() {
    let mut engine = MelodicEngine::new();
    engine.rebuild_chord_pool(&ctx(&[60, 64, 65], "c-major"));
    assert_eq!(engine.chord_pool(), &[vec![60, 64]]);
}

#[test]
fn custom_selection_uses_sliding_windows() {
    let mut engine = MelodicEngine::new();
    engine.rebuild_chord_pool(&ctx(&[60, 62, 64, 65], "custom"));
    assert_eq!(engine.chord_pool(), &[vec![60, 62, 64], vec![62, 64, 65]]);
}

#[test]
fn too_few_notes_leave_the_pool_empty() {
    let mut engine = MelodicEngine::new();
    let context = ctx(&[60, 62], "custom");
    engine.rebuild_chord_pool(&context);
    assert!(engine.chord_pool().is_empty());

    let mut rng = StdRng::seed_from_u64(3);
    engine.generate_melodic_phrase(&context, &mut rng);
    assert!(engine.phrase().is_empty());

    let mut current = 60;
    for _ in 0..50 {
        let next = engine
            .next_random_note(Some(current), &context, &mut rng)
            .expect("note");
        assert_ne!(next, current);
        current = next;
    }
}

#[test]
fn phrase_opens_and_closes_on_the_tonic() {
    for seed in 0..40 {
        let mut engine = MelodicEngine::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let context = ctx(&PENTATONIC, "c-major-pent");
        engine.generate_melodic_phrase(&context, &mut rng);

        let phrase: Vec<u8> = engine.phrase().iter().copied().collect();
        assert!(phrase.len() > 2 && phrase.len() <= 16, "{phrase:?}");
        assert_eq!(phrase.first(), Some(&60));
        assert_eq!(phrase.last(), Some(&60));
        assert!(phrase.iter().all(|note| PENTATONIC.contains(note)));
        assert!(
            phrase.windows(2).all(|pair| pair[0] != pair[1]),
            "adjacent repeat in {phrase:?}"
        );
    }
}

#[test]
fn motif_moves_by_small_steps_inside_the_chord() {
    let mut engine = MelodicEngine::new();
    let mut rng = StdRng::seed_from_u64(8);
    let context = ctx(&[60, 64, 67], "custom");
    let motif = engine.generate_motif(&[60, 64, 67], 8, &context, &mut rng);

    assert_eq!(motif.len(), 8);
    assert!(motif.iter().all(|note| [60, 64, 67].contains(note)));
    assert!(motif.windows(2).all(|pair| pair[0].abs_diff(pair[1]) <= 5));
    assert_eq!(engine.last_note(), motif.last().copied());
}

#[test]
fn random_notes_are_active_and_never_repeat() {
    let selections: [(&[u8], &str); 4] = [
        (&PENTATONIC, "c-major-pent"),
        (&[60, 62, 63, 65, 67, 68, 70, 72], "c-natural-minor"),
        (&[60, 61, 62], "custom"),
        (&[60, 67], "c-major"),
    ];
    for (seed, (active, preset)) in selections.into_iter().enumerate() {
        let mut engine = MelodicEngine::new();
        let mut rng = StdRng::seed_from_u64(seed as u64);
        let context = ctx(active, preset);
        let mut current = None;
        for _ in 0..400 {
            let next = engine
                .next_random_note(current, &context, &mut rng)
                .expect("note");
            assert!(active.contains(&next), "{next} not in {active:?}");
            assert_ne!(Some(next), current);
            current = Some(next);
        }
    }
}

#[test]
fn single_active_note_is_always_returned() {
    let mut engine = MelodicEngine::new();
    let mut rng = StdRng::seed_from_u64(1);
    let context = ctx(&[65], "custom");
    for _ in 0..10 {
        assert_eq!(engine.next_random_note(Some(65), &context, &mut rng), Some(65));
    }
}

#[test]
fn empty_active_set_yields_nothing() {
    let mut engine = MelodicEngine::new();
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(engine.next_random_note(None, &ctx(&[], "custom"), &mut rng), None);
}

#[test]
fn stale_current_note_discards_old_phrase() {
    let mut engine = MelodicEngine::new();
    let mut rng = StdRng::seed_from_u64(5);
    let wide = ctx(&PENTATONIC, "c-major-pent");
    let first = engine.next_random_note(None, &wide, &mut rng).expect("note");
    assert!(!engine.phrase().is_empty());

    let narrow_notes = [62, 64, 65, 67];
    let narrow = ctx(&narrow_notes, "custom");
    let stale = 72;
    let next = engine
        .next_random_note(Some(stale), &narrow, &mut rng)
        .expect("note");
    assert!(narrow_notes.contains(&next));
    assert!(engine.phrase().iter().all(|note| narrow_notes.contains(note)));
    assert_eq!(first, 60);
}

#[test]
fn reset_clears_phrase_state() {
    let mut engine = MelodicEngine::new();
    let mut rng = StdRng::seed_from_u64(2);
    let context = ctx(&PENTATONIC, "c-major-pent");
    engine.next_random_note(None, &context, &mut rng);
    engine.reset();
    assert!(engine.phrase().is_empty());
    assert!(engine.chord_pool().is_empty());
    assert_eq!(engine.last_note(), None);
}

#[test]
fn upcoming_matches_what_is_handed_out() {
    let mut engine = MelodicEngine::new();
    let mut rng = StdRng::seed_from_u64(12);
    let context = ctx(&PENTATONIC, "c-major-pent");
    let mut current = engine.next_random_note(None, &context, &mut rng).expect("note");

    let preview = engine.upcoming(current, 5);
    assert!(!preview.is_empty());
    for expected in preview {
        current = engine
            .next_random_note(Some(current), &context, &mut rng)
            .expect("note");
        assert_eq!(current, expected);
    }
}
