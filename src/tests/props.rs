use proptest::prelude::*;

use crate::host::Host;

use super::{register_text, setup, vim_cmd};

fn word_lines(min_lines: usize) -> impl Strategy<Value = String> {
	prop::collection::vec("[a-z]{1,6}( [a-z]{1,6}){0,3}", min_lines..6)
		.prop_map(|lines| lines.join("\n"))
}

fn any_text() -> impl Strategy<Value = String> {
	prop_oneof![
		Just(String::new()),
		"[a-zA-Z0-9 .,;()_-]{0,40}",
		"[a-z \n]{0,80}",
		"[ \t]{0,4}[a-z]{0,8}\n\n[ \t]{0,4}[a-z]{0,8}",
		"[a-zé漢 \n]{0,30}",
	]
}

fn motion_keys() -> impl Strategy<Value = &'static str> {
	prop::sample::select(vec![
		"h", "j", "k", "l", "w", "b", "e", "W", "B", "E", "ge", "0", "^", "$", "gg", "G",
		"{", "}", "(", ")", "%", "H", "M", "L", "fa", "Ta", ";", ",", "+", "-", "_", "|",
	])
}

fn single_edits() -> impl Strategy<Value = &'static str> {
	prop::sample::select(vec!["x", "X", "dw", "dd", "D", "J", "~", "guu", "gUiw", ">>", "<<", "dip", "das"])
}

proptest! {
	#[test]
	fn motions_keep_the_cursor_in_bounds(
		text in any_text(),
		line in 0usize..8,
		ch in 0usize..50,
		count in 0usize..5,
		motion in motion_keys(),
	) {
		let (mut vim, mut editor) = setup(&text, line, ch);
		let keys = if count > 0 { format!("{count}{motion}") } else { motion.to_string() };
		prop_assert!(vim.handle_keys(&mut editor, &keys).is_ok());
		let cursor = editor.host().cursor();
		let lines = editor.host().lines();
		prop_assert!(cursor.line < lines.len());
		prop_assert!(cursor.ch <= lines[cursor.line].chars().count());
		prop_assert_eq!(editor.host().text(), text);
	}

	#[test]
	fn operator_and_motion_counts_multiply(text in word_lines(1), op_count in 1usize..4, motion_count in 1usize..4) {
		let split = vim_cmd(&format!("{op_count}d{motion_count}w"), &text, (0,0));
		let total = vim_cmd(&format!("d{}w", op_count * motion_count), &text, (0,0));
		prop_assert_eq!(split, total);
	}

	#[test]
	fn delete_then_put_before_restores(text in word_lines(2)) {
		prop_assert_eq!(vim_cmd("ddP", &text, (0,0)).0, text.clone());
		prop_assert_eq!(vim_cmd("dwP", &text, (0,0)).0, text);
	}

	#[test]
	fn undo_reverts_a_single_edit(text in word_lines(1), line in 0usize..6, ch in 0usize..20, edit in single_edits()) {
		let (mut vim, mut editor) = setup(&text, line, ch);
		vim.handle_keys(&mut editor, edit).unwrap();
		vim.handle_keys(&mut editor, "u").unwrap();
		prop_assert_eq!(editor.host().text(), text);
	}

	#[test]
	fn dot_repeats_like_typing_again(text in word_lines(2), edit in single_edits()) {
		let repeated = vim_cmd(&format!("{edit}."), &text, (0,0));
		let typed = vim_cmd(&format!("{edit}{edit}"), &text, (0,0));
		prop_assert_eq!(repeated, typed);
	}

	#[test]
	fn unnamed_register_mirrors_last_yank(text in word_lines(1), motion in motion_keys()) {
		let (mut vim, mut editor) = setup(&text, 0, 0);
		vim.handle_keys(&mut editor, &format!("y{motion}")).unwrap();
		let unnamed = register_text(&mut vim, '"');
		prop_assert_eq!(unnamed, register_text(&mut vim, '0'));
		prop_assert_eq!(editor.host().text(), text);
	}

	#[test]
	fn macro_replay_matches_typing(
		text in word_lines(3),
		keys in prop::collection::vec(prop::sample::select(vec!["x", "dw", "J", "~", "j", "w", "gUiw", "de"]), 1..4),
		times in 1usize..4,
	) {
		let keys = keys.concat();
		let replayed = vim_cmd(&format!("qa{keys}q{times}@a"), &text, (0,0));
		let typed = vim_cmd(&keys.repeat(times + 1), &text, (0,0));
		prop_assert_eq!(replayed, typed);
	}

	#[test]
	fn unbound_keys_change_nothing(text in word_lines(1), keys in "[QKZ&\\\\]{1,8}") {
		let (out, cursor) = vim_cmd(&keys, &text, (0,0));
		prop_assert_eq!(out, text);
		prop_assert_eq!(cursor, (0,0));
	}
}
