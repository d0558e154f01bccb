use pretty_assertions::assert_eq;

use crate::keymap::{Keymap, MatchResult};
use crate::keys::{split_keys, split_macro_keys};
use crate::state::InputState;
use crate::vicmd::{Action, CommandKind, Context, Motion, Operator, OperatorArgs};

fn full_kind(result: MatchResult) -> CommandKind {
	match result {
		MatchResult::Full { command, .. } => command.kind,
		other => panic!("expected a full match, got {other:?}")
	}
}

#[test]
fn keymap_no_match() {
	let keymap = Keymap::new();
	let input = InputState::default();
	assert_eq!(keymap.match_command("Z", &input, Context::Normal, false), MatchResult::None);
	assert_eq!(keymap.match_command("gZ", &input, Context::Normal, false), MatchResult::None);
}

#[test]
fn keymap_partial_match() {
	let keymap = Keymap::new();
	let input = InputState::default();
	assert_eq!(
		keymap.match_command("g", &input, Context::Normal, false),
		MatchResult::Partial { expect_literal_next: false }
	);
	assert_eq!(
		keymap.match_command("r", &input, Context::Normal, false),
		MatchResult::Partial { expect_literal_next: true }
	);
}

#[test]
fn keymap_pending_results() {
	let keymap = Keymap::new();
	let input = InputState::default();
	let results: Vec<_> = ["Z", "g", "r", "r<Left>"].into_iter()
		.map(|keys| (keys, keymap.match_command(keys, &input, Context::Normal, false)))
		.collect();
	insta::assert_debug_snapshot!(results, @r#"
	[
	    (
	        "Z",
	        None,
	    ),
	    (
	        "g",
	        Partial {
	            expect_literal_next: false,
	        },
	    ),
	    (
	        "r",
	        Partial {
	            expect_literal_next: true,
	        },
	    ),
	    (
	        "r<Left>",
	        Clear,
	    ),
	]
	"#);
}

#[test]
fn keymap_placeholder_match() {
	let keymap = Keymap::new();
	let input = InputState::default();
	let MatchResult::Full { command, selected_character } = keymap.match_command("fx", &input, Context::Normal, false) else {
		panic!("no match for fx")
	};
	assert_eq!(command.keys, "f<character>");
	assert_eq!(selected_character, Some('x'));

	let MatchResult::Full { selected_character, .. } = keymap.match_command("r<CR>", &input, Context::Normal, false) else {
		panic!("no match for r<CR>")
	};
	assert_eq!(selected_character, Some('\n'));
	assert_eq!(keymap.match_command("r<Left>", &input, Context::Normal, false), MatchResult::Clear);
}

#[test]
fn keymap_context_filters() {
	let keymap = Keymap::new();
	let input = InputState::default();
	assert!(matches!(
		full_kind(keymap.match_command("u", &input, Context::Normal, false)),
		CommandKind::Action { action: Action::Undo, .. }
	));
	assert!(matches!(
		full_kind(keymap.match_command("u", &input, Context::Visual, false)),
		CommandKind::Operator(Operator::ChangeCase, _)
	));
	// insert context only sees insert bindings
	assert_eq!(keymap.match_command("x", &input, Context::Insert, false), MatchResult::None);
	assert!(matches!(
		full_kind(keymap.match_command("<C-w>", &input, Context::Insert, false)),
		CommandKind::OperatorMotion { operator: Operator::Delete, .. }
	));
}

#[test]
fn keymap_pending_operator_rules_out_actions() {
	let keymap = Keymap::new();
	let input = InputState::default().with_operator(Operator::Delete, OperatorArgs::default());
	assert_eq!(keymap.match_command("p", &input, Context::Normal, false), MatchResult::None);
	assert!(matches!(
		full_kind(keymap.match_command("iw", &input, Context::Normal, false)),
		CommandKind::Motion(Motion::TextObjectManipulation, _)
	));
}

#[test]
fn keymap_newest_mapping_wins() {
	let mut keymap = Keymap::new();
	let input = InputState::default();
	keymap.map("Q", "dd", None, false);
	keymap.map("Q", "yy", None, false);
	assert_eq!(
		full_kind(keymap.match_command("Q", &input, Context::Normal, false)),
		CommandKind::KeyToKey("yy".into())
	);
	// user mappings shadow the defaults
	keymap.map("x", "dd", Some(Context::Normal), false);
	assert_eq!(
		full_kind(keymap.match_command("x", &input, Context::Normal, false)),
		CommandKind::KeyToKey("dd".into())
	);
	assert!(matches!(
		full_kind(keymap.match_command("x", &input, Context::Normal, true)),
		CommandKind::OperatorMotion { operator: Operator::Delete, .. }
	));
}

#[test]
fn keymap_unmap_default_binding() {
	let mut keymap = Keymap::new();
	let input = InputState::default();
	let before = keymap.commands().len();
	assert!(keymap.unmap("gJ", None));
	assert_eq!(keymap.commands().len(), before - 1);
	assert_eq!(keymap.user_len(), 0);
	assert_eq!(keymap.match_command("gJ", &input, Context::Normal, false), MatchResult::None);
	assert!(!keymap.unmap("gJ", None));
}

#[test]
fn keymap_mapclear_splits_context_free_mappings() {
	let mut keymap = Keymap::new();
	let input = InputState::default();
	keymap.map("Q", "dd", None, false);
	keymap.map("Z", "yy", Some(Context::Visual), false);
	keymap.mapclear(Some(Context::Visual));
	let user: Vec<_> = keymap.commands()[..keymap.user_len()]
		.iter()
		.map(|c| (c.keys.as_str(), c.context))
		.collect();
	assert_eq!(user, vec![("Q", Some(Context::Insert)), ("Q", Some(Context::Normal))]);
	assert_eq!(keymap.match_command("Q", &input, Context::Visual, false), MatchResult::None);
}

#[test]
fn keymap_split_keys() {
	assert_eq!(split_keys("d2w"), vec!["d", "2", "w"]);
	assert_eq!(split_keys("ihi<Esc>"), vec!["i", "h", "i", "<Esc>"]);
	assert_eq!(split_keys("<C-w>x<lt>"), vec!["<C-w>", "x", "<lt>"]);
	assert_eq!(split_keys("a<b"), vec!["a", "<", "b"]);
	assert_eq!(split_macro_keys("<C-]>x"), vec!["<C-]>", "x"]);
}
