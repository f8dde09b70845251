//! Property-based tests for naming, progress clamping and selection state.

#![allow(clippy::unwrap_used)]

use kitty_core::Handle;
use kitty_core::InputReference;
use kitty_core::InputRegistry;
use kitty_core::OperationKind;
use kitty_core::SelectionMode;
use kitty_core::naming::compute_base_name;
use kitty_core::naming::numbered_name;
use kitty_core::naming::strip_extension;
use kitty_core::progress::clamp_percent;
use kitty_core::progress::progress_channel;
use proptest::prelude::*;

fn file(id: u8) -> InputReference {
    InputReference::file(Handle::new(format!("mem:f{id}")), Some(format!("f{id}.txt")))
}

proptest! {
    /// The display name always wins over the raw identifier.
    #[test]
    fn prop_display_name_strips_one_extension(
        stem in "[a-z0-9]{1,12}(\\.[a-z0-9]{1,4}){0,2}",
        ext in "[a-z]{1,5}",
        raw in ".{0,30}",
    ) {
        let name = format!("{stem}.{ext}");
        prop_assert_eq!(compute_base_name(Some(&name), &raw), Some(stem));
    }

    /// Raw identifiers are parsed after the last colon and slash.
    #[test]
    fn prop_raw_id_fallback(
        scheme in "[a-z]{1,8}(:[a-z]{1,8}){0,2}",
        dirs in prop::collection::vec("[A-Za-z0-9 ]{1,8}", 0..4),
        stem in "[A-Za-z0-9_-]{1,12}",
        ext in "[a-z]{1,5}",
    ) {
        let mut path = dirs.join("/");
        if !path.is_empty() {
            path.push('/');
        }
        let raw = format!("{scheme}:{path}{stem}.{ext}");
        prop_assert_eq!(compute_base_name(None, &raw), Some(stem));
    }

    /// Stripping never grows a name and is stable on names without a dot.
    #[test]
    fn prop_strip_extension_prefix(name in "[^.]{0,10}(\\.[^.]{0,5}){0,3}") {
        let stripped = strip_extension(&name);
        prop_assert!(name.starts_with(stripped));
        if !name.contains('.') {
            prop_assert_eq!(stripped, name.as_str());
        }
    }

    /// Numbered names keep the extension.
    #[test]
    fn prop_numbered_name_keeps_extension(
        stem in "[a-z]{1,10}",
        ext in "[a-z]{1,4}",
        n in 1usize..1000,
    ) {
        let numbered = numbered_name(&format!("{stem}.{ext}"), n);
        prop_assert_eq!(numbered, format!("{stem} ({n}).{ext}"));
    }

    /// Every raw value reaches the receiver inside 0..=100.
    #[test]
    fn prop_progress_is_clamped(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let (tx, rx) = progress_channel(OperationKind::Extract);
        for value in &values {
            tx.report(*value);
        }
        drop(tx);

        let seen: Vec<u8> = rx.iter().map(|e| e.percent).collect();
        prop_assert_eq!(seen.len(), values.len());
        for (raw, percent) in values.iter().zip(&seen) {
            prop_assert_eq!(*percent, clamp_percent(*raw));
            prop_assert!(*percent <= 100);
        }
    }

    /// Single-file mode holds exactly for one file and no tree.
    #[test]
    fn prop_mode_detection(file_count in 0u8..5, with_tree in any::<bool>()) {
        let mut registry = InputRegistry::new();
        registry.apply_file_selection((0..file_count).map(file).collect());
        if with_tree {
            registry.apply_tree_selection(Some(InputReference::tree(
                Handle::new("mem:tree"),
                Some("tree".into()),
            )));
        }

        let expected = if file_count == 1 && !with_tree {
            SelectionMode::SingleFile
        } else {
            SelectionMode::Multi
        };
        prop_assert_eq!(registry.current().mode(), expected);
    }

    /// The selection order holds each selected handle once, latest
    /// selection last, and nothing that is no longer selected.
    #[test]
    fn prop_selection_order(
        batches in prop::collection::vec(prop::collection::vec(0u8..6, 0..5), 1..6),
    ) {
        let mut registry = InputRegistry::new();
        registry.apply_tree_selection(Some(InputReference::tree(
            Handle::new("mem:tree"),
            Some("tree".into()),
        )));
        for batch in &batches {
            registry.apply_file_selection(batch.iter().copied().map(file).collect());
        }

        let current = registry.current();
        let order = current.order();
        let mut unique = order.to_vec();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), order.len());
        prop_assert_eq!(order.len(), current.files().len() + 1);
        prop_assert_eq!(order[0].as_str(), "mem:tree");
        for (reference, handle) in current.files().iter().zip(&order[1..]) {
            prop_assert_eq!(&reference.handle, handle);
        }
    }
}
