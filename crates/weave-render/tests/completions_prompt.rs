#![allow(missing_docs, unused_results)]

use assert_matches::assert_matches;
use serde_json::json;
use weave_render::{
    CompletionRequestData, Document, PromptRenderer, RenderOptions, RenderResult, RenderedPrompt,
    additional_completions_context, completions_context, current_file,
};
use weave_core::CancellationToken;
use weave_settings::RenderSettings;
use weave_tokens::TokenizerName;
use weave_tree::{
    Element, SnapshotResult, VirtualNode, VirtualPrompt, chunk, component_fn, fragment, text,
    text_parts,
};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

const DOC: &str = "const a = 1;\nfunction f|\nconst b = 2;\nconst c = 3;";

/// Request for `marked`, with the cursor at the first `|`.
fn request(marked: &str) -> CompletionRequestData {
    let offset = marked.find('|').unwrap();
    let text = marked.replacen('|', "", 1);
    CompletionRequestData::new(Document::new("file:///test.ts", "typescript", text), offset)
}

fn another_component(number: i32) -> Element {
    Element::of(component_fn("AnotherComponent", move |_, _| {
        vec![text_parts([Element::text("This is a number "), Element::number(number)])]
    }))
}

fn my_nested_component() -> Element {
    Element::of(component_fn("MyNestedComponent", |_, _| {
        vec![fragment([
            text("This goes first").with_weight(0.5),
            text("This goes last").with_weight(0.6),
        ])]
    }))
}

fn full_prompt() -> Element {
    fragment([
        completions_context([
            another_component(1),
            my_nested_component(),
            another_component(2),
            fragment([text("Raw text")]),
            fragment([text("Another raw text")]),
        ]),
        current_file(),
    ])
}

fn options(limit: usize, suffix_percent: u32) -> RenderOptions {
    RenderOptions::from_settings(&RenderSettings::default(), "typescript")
        .with_limit(limit)
        .with_suffix_percent(suffix_percent)
        .with_language("typescript")
}

fn snapshot(prompt: &mut VirtualPrompt) -> std::sync::Arc<weave_tree::SnapshotNode> {
    prompt.snapshot(None).into_snapshot().unwrap()
}

async fn render_result(
    root: Element,
    marked: &str,
    renderer: &PromptRenderer,
    opts: &RenderOptions,
) -> RenderResult {
    let mut prompt = VirtualPrompt::new(root).unwrap();
    prompt.create_pipe().pump(request(marked)).await.unwrap();
    renderer.render(&snapshot(&mut prompt), opts, None)
}

async fn render_split(root: Element, marked: &str, opts: &RenderOptions) -> RenderedPrompt {
    render_result(root, marked, &PromptRenderer::split_context(), opts)
        .await
        .into_prompt()
        .unwrap()
}

fn render_without_data(root: Element, opts: &RenderOptions) -> RenderedPrompt {
    let mut prompt = VirtualPrompt::new(root).unwrap();
    PromptRenderer::split_context()
        .render(&snapshot(&mut prompt), opts, None)
        .into_prompt()
        .unwrap()
}

fn context_only(children: Vec<Element>, limit: usize) -> Vec<String> {
    let root = fragment([completions_context(children), current_file()]);
    render_without_data(root, &options(limit, 0)).context.unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Layouts
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn split_layout_returns_everything_that_fits() {
    let prompt = render_split(full_prompt(), DOC, &options(70, 20)).await;

    assert_eq!(prompt.prefix, "const a = 1;\nfunction f");
    assert_eq!(prompt.suffix, "const b = 2;\nconst c = 3;");
    assert_eq!(
        prompt.context,
        Some(vec![
            "This is a number 1\nThis goes first\nThis goes last\nThis is a number 2\nRaw text\nAnother raw text"
                .to_string()
        ])
    );
    assert_eq!(prompt.prefix_tokens, 37);
    assert_eq!(prompt.suffix_tokens, 12);
}

#[tokio::test]
async fn cl100k_counts_match_o200k_for_this_prompt() {
    let mut opts = options(70, 20);
    opts.tokenizer = TokenizerName::Cl100k;
    let prompt = render_split(full_prompt(), DOC, &opts).await;
    assert_eq!(prompt.prefix_tokens, 37);
    assert_eq!(prompt.suffix_tokens, 12);
    assert_eq!(prompt.metadata.tokenizer, TokenizerName::Cl100k);
}

#[tokio::test]
async fn combined_layout_comments_context_into_prefix() {
    let renderer = PromptRenderer::completions();
    let prompt = render_result(full_prompt(), DOC, &renderer, &options(1000, 20))
        .await
        .into_prompt()
        .unwrap();

    assert_eq!(
        prompt.prefix,
        "// This is a number 1\n// This goes first\n// This goes last\n// This is a number 2\n// Raw text\n// Another raw text\nconst a = 1;\nfunction f"
    );
    assert_eq!(prompt.suffix, "const b = 2;\nconst c = 3;");
    assert_eq!(prompt.context, None);
}

#[tokio::test]
async fn combined_layout_uses_document_language() {
    let renderer = PromptRenderer::completions();
    let opts = options(1000, 20).with_language("python");
    let prompt = render_result(full_prompt(), DOC, &renderer, &opts)
        .await
        .into_prompt()
        .unwrap();
    assert!(prompt.prefix.starts_with("# This is a number 1\n# This goes first\n"));
}

#[tokio::test]
async fn current_file_alone_renders_prefix_and_suffix() {
    let marked = "const a = 1;\nfunction f|\nconst b = 2;";
    let opts = options(1000, 20);

    let split = render_split(current_file(), marked, &opts).await;
    assert_eq!(split.prefix, "const a = 1;\nfunction f");
    assert_eq!(split.suffix, "const b = 2;");
    assert_eq!(split.context, Some(Vec::new()));

    let combined = render_result(current_file(), marked, &PromptRenderer::completions(), &opts)
        .await
        .into_prompt()
        .unwrap();
    assert_eq!(combined.prefix, "const a = 1;\nfunction f");
    assert_eq!(combined.context, None);
}

#[tokio::test]
async fn context_groups_are_returned_separately() {
    let root = fragment([
        completions_context([text("one")]),
        additional_completions_context([text("two"), text("three")]),
        completions_context([]),
        current_file(),
    ]);
    let prompt = render_split(root, DOC, &options(1000, 20)).await;
    assert_eq!(
        prompt.context,
        Some(vec!["one".to_string(), "two\nthree".to_string()])
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Cursor handling
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn prefix_can_be_empty() {
    let prompt = render_split(current_file(), "|\nconst b = 2;", &options(100, 20)).await;
    assert_eq!(prompt.prefix, "");
    assert_eq!(prompt.suffix, "const b = 2;");
}

#[tokio::test]
async fn crlf_documents_render_like_lf() {
    let marked = "const a = 1;\r\nfunction f|\r\nconst b = 2;\r\nconst c = 3;";
    let prompt = render_split(full_prompt(), marked, &options(70, 20)).await;
    assert_eq!(prompt.prefix, "const a = 1;\nfunction f");
    assert_eq!(prompt.suffix, "const b = 2;\nconst c = 3;");
    assert_eq!(prompt.suffix_tokens, 12);
}

#[tokio::test]
async fn cursor_inside_multibyte_char_moves_to_its_start() {
    let doc = Document::new("file:///test.ts", "typescript", "é=1\nnext");
    let mut prompt = VirtualPrompt::new(current_file()).unwrap();
    prompt
        .create_pipe()
        .pump(CompletionRequestData::new(doc, 1))
        .await
        .unwrap();

    let snap = prompt.snapshot(None);
    assert_matches!(snap, SnapshotResult::Ok(_));
    let rendered = PromptRenderer::split_context()
        .render(&snap.into_snapshot().unwrap(), &options(100, 20), None)
        .into_prompt()
        .unwrap();
    assert_eq!(rendered.prefix, "");
    assert_eq!(rendered.suffix, "next");
}

#[test]
fn no_request_renders_empty_prefix_and_suffix() {
    let prompt = render_without_data(full_prompt(), &options(70, 20));
    assert_eq!(prompt.prefix, "");
    assert_eq!(prompt.suffix, "");
    assert_eq!(prompt.context.map(|c| c.len()), Some(1));
}

// ─────────────────────────────────────────────────────────────────────────────
// Elision
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_suffix_share_drops_suffix_and_elides_context() {
    let prompt = render_split(full_prompt(), DOC, &options(30, 0)).await;
    assert_eq!(prompt.prefix, "const a = 1;\nfunction f");
    assert_eq!(prompt.suffix, "");
    assert_eq!(prompt.suffix_tokens, 0);
    assert_eq!(
        prompt.context,
        Some(vec![
            "This is a number 1\nThis is a number 2\nRaw text\nAnother raw text".to_string()
        ])
    );
}

#[tokio::test]
async fn suffix_is_cut_to_its_share() {
    let prompt = render_split(full_prompt(), DOC, &options(30, 10)).await;
    assert_eq!(prompt.suffix, "const b =");
    assert_eq!(prompt.suffix_tokens, 3);
    assert_eq!(prompt.prefix, "const a = 1;\nfunction f");
    assert_eq!(
        prompt.context,
        Some(vec!["This is a number 2\nRaw text\nAnother raw text".to_string()])
    );
}

#[tokio::test]
async fn tight_budget_elides_context_and_suffix() {
    let prompt = render_split(full_prompt(), DOC, &options(20, 10)).await;
    let context = prompt.context.unwrap();
    assert!(context[0].len() < "This is a number 1\nThis goes first\nThis goes last\nThis is a number 2\nRaw text\nAnother raw text".len());
    assert!(prompt.suffix.len() < "const b = 2;\nconst c = 3;".len());
}

#[tokio::test]
async fn prefix_is_truncated_from_the_top() {
    let prompt = render_split(full_prompt(), DOC, &options(5, 0)).await;
    assert_eq!(prompt.prefix, "function f");
    assert_eq!(prompt.prefix_tokens, 2);
    assert_eq!(prompt.context, Some(Vec::new()));
}

#[test]
fn chunk_is_removed_whole() {
    let context = context_only(
        vec![
            chunk([text("Chunk Text 1"), text("Chunk Text 2")]).with_weight(0.5),
            text("Outside Text"),
        ],
        10,
    );
    assert_eq!(context, vec!["Outside Text"]);
}

#[test]
fn low_weight_chunk_between_texts_goes_first() {
    let context = context_only(
        vec![
            text("Outside Text 1").with_weight(0.7),
            chunk([text("Chunk Text 1"), text("Chunk Text 2")]).with_weight(0.5),
            text("Outside Text 2").with_weight(0.7),
        ],
        16,
    );
    assert_eq!(context, vec!["Outside Text 1\nOutside Text 2"]);
}

#[test]
fn removed_text_is_backfilled_when_chunk_cannot_be() {
    let context = context_only(
        vec![
            text("Outside Text 1").with_weight(0.5),
            chunk([text("Chunk Text 1"), text("Chunk Text 2")]).with_weight(0.7),
            text("Outside Text 2").with_weight(0.8),
        ],
        14,
    );
    assert_eq!(context, vec!["Outside Text 1\nOutside Text 2"]);
}

#[test]
fn heavier_chunk_outlives_lighter_texts() {
    let context = context_only(
        vec![
            text("Outside Text 1").with_weight(0.7),
            chunk([text("Chunk Text 1"), text("Chunk Text 2")]).with_weight(0.8),
            text("Outside Text 2").with_weight(0.7),
        ],
        14,
    );
    assert_eq!(context, vec!["Chunk Text 1\nChunk Text 2"]);
}

#[test]
fn nested_chunk_is_removed_before_its_parent() {
    let context = context_only(
        vec![
            text("Outside Text 1").with_weight(0.7),
            chunk([
                text("Chunk Text 1"),
                chunk([text("Nested Chunk Text 1"), text("Nested Chunk Text 2")]).with_weight(0.5),
                text("Chunk Text 2"),
            ])
            .with_weight(0.5),
            text("Outside Text 2").with_weight(0.7),
        ],
        30,
    );
    assert_eq!(
        context,
        vec!["Outside Text 1\nChunk Text 1\nChunk Text 2\nOutside Text 2"]
    );
}

#[test]
fn light_text_in_outer_chunk_takes_nested_chunk_with_it() {
    let context = context_only(
        vec![
            text("Outside Text 1").with_weight(0.7),
            chunk([
                text("Chunk Text 1").with_weight(0.5),
                chunk([text("Nested Chunk Text 1"), text("Nested Chunk Text 2")]),
                text("Chunk Text 2"),
            ])
            .with_weight(0.5),
            text("Outside Text 2").with_weight(0.7),
        ],
        30,
    );
    assert_eq!(context, vec!["Outside Text 1\nOutside Text 2"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

fn token_rows(prompt: &RenderedPrompt) -> Vec<(String, Option<usize>, Option<usize>)> {
    prompt
        .metadata
        .component_statistics
        .iter()
        .filter(|s| s.expected_tokens.is_some())
        .map(|s| (s.component_path.clone(), s.expected_tokens, s.actual_tokens))
        .collect()
}

fn row(path: &str, expected: usize, actual: usize) -> (String, Option<usize>, Option<usize>) {
    (path.to_string(), Some(expected), Some(actual))
}

#[tokio::test]
async fn statistics_list_timings_then_blocks() {
    let prompt = render_split(full_prompt(), DOC, &options(70, 20)).await;
    let stats = &prompt.metadata.component_statistics;

    assert_eq!(stats[0].component_path, "$.f[1].CurrentFile");
    assert!(stats[0].update_data_time_ms.is_some());
    assert!(stats[0].expected_tokens.is_none());

    assert_eq!(
        token_rows(&prompt),
        vec![
            row("$.f[0].CompletionsContext[0].AnotherComponent[0].Text[0]", 7, 7),
            row("$.f[0].CompletionsContext[1].MyNestedComponent[0].f[0].Text[0]", 4, 4),
            row("$.f[0].CompletionsContext[1].MyNestedComponent[0].f[1].Text[0]", 4, 4),
            row("$.f[0].CompletionsContext[2].AnotherComponent[0].Text[0]", 7, 7),
            row("$.f[0].CompletionsContext[3].f[0].Text[0]", 3, 3),
            row("$.f[0].CompletionsContext[4].f[0].Text[0]", 4, 4),
            row("$.f[1].CurrentFile[0].f[0].BeforeCursor[0].Text[0]", 8, 8),
            row("$.f[1].CurrentFile[0].f[1].AfterCursor[0].Text[0]", 12, 12),
        ]
    );
    assert!(prompt.metadata.update_data_time_ms >= 0.0);
}

#[tokio::test]
async fn statistics_report_elided_tokens() {
    let prompt = render_split(full_prompt(), DOC, &options(40, 10)).await;

    assert_eq!(
        token_rows(&prompt),
        vec![
            row("$.f[0].CompletionsContext[0].AnotherComponent[0].Text[0]", 7, 7),
            row("$.f[0].CompletionsContext[1].MyNestedComponent[0].f[0].Text[0]", 4, 0),
            row("$.f[0].CompletionsContext[1].MyNestedComponent[0].f[1].Text[0]", 4, 0),
            row("$.f[0].CompletionsContext[2].AnotherComponent[0].Text[0]", 7, 7),
            row("$.f[0].CompletionsContext[3].f[0].Text[0]", 3, 3),
            row("$.f[0].CompletionsContext[4].f[0].Text[0]", 4, 4),
            row("$.f[1].CurrentFile[0].f[0].BeforeCursor[0].Text[0]", 8, 8),
            row("$.f[1].CurrentFile[0].f[1].AfterCursor[0].Text[0]", 12, 4),
        ]
    );
    let actual: usize = prompt
        .metadata
        .component_statistics
        .iter()
        .filter_map(|s| s.actual_tokens)
        .sum();
    assert_eq!(actual, 33);
    assert_eq!(prompt.suffix.trim_end(), "const b =");
    assert_eq!(prompt.suffix_tokens, 4);
    assert_eq!(prompt.prefix_tokens, 29);
}

#[tokio::test]
async fn statistics_carry_source() {
    let root = fragment([
        completions_context([text("sourced").with_source(json!({"uri": "file:///b.ts"}))]),
        current_file(),
    ]);
    let prompt = render_split(root, DOC, &options(1000, 20)).await;
    let stats = &prompt.metadata.component_statistics;
    let sourced = stats
        .iter()
        .find(|s| s.component_path == "$.f[0].CompletionsContext[0].Text[0]")
        .unwrap();
    assert_eq!(sourced.source, Some(json!({"uri": "file:///b.ts"})));
}

#[tokio::test]
async fn metadata_serializes_camel_case() {
    let prompt = render_split(current_file(), DOC, &options(1000, 20)).await;
    let json = serde_json::to_value(&prompt).unwrap();
    assert_eq!(json["metadata"]["renderId"], 0);
    assert_eq!(json["metadata"]["tokenizer"], "o200k");
    assert_eq!(json["suffixTokens"], 12);
    assert!(json["metadata"]["componentStatistics"].is_array());
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors and cancellation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_suffixes_are_rejected() {
    let root = fragment([current_file(), current_file()]);
    let result = render_result(root, DOC, &PromptRenderer::split_context(), &options(100, 20)).await;
    assert_eq!(
        result.error().map(ToString::to_string).as_deref(),
        Some("Only one suffix is allowed")
    );
}

#[test]
fn tree_without_cursor_is_rejected() {
    let mut prompt = VirtualPrompt::new(completions_context([text("ctx")])).unwrap();
    let result = PromptRenderer::split_context().render(&snapshot(&mut prompt), &options(100, 20), None);
    assert_eq!(
        result.error().map(ToString::to_string).as_deref(),
        Some("Node of type BeforeCursor not found")
    );
}

#[test]
fn invalid_budget_is_an_error_result() {
    let prompt = render_without_data(current_file(), &options(1, 0));
    assert_eq!(prompt.prefix, "");

    let mut tree = VirtualPrompt::new(current_file()).unwrap();
    let result = PromptRenderer::split_context().render(&snapshot(&mut tree), &options(0, 0), None);
    assert!(result.error().is_some());
}

#[test]
fn cancelled_token_stops_snapshot_and_render() {
    let token = CancellationToken::new();
    token.cancel();

    let mut prompt = VirtualPrompt::new(full_prompt()).unwrap();
    assert_matches!(prompt.snapshot(Some(&token)), SnapshotResult::Cancelled);

    let snap = snapshot(&mut prompt);
    let result = PromptRenderer::split_context().render(&snap, &options(70, 20), Some(&token));
    assert_matches!(result, RenderResult::Cancelled);
}

#[tokio::test]
async fn rerendering_a_snapshot_is_stable() {
    let mut prompt = VirtualPrompt::new(full_prompt()).unwrap();
    prompt.create_pipe().pump(request(DOC)).await.unwrap();
    let snap = snapshot(&mut prompt);

    let renderer = PromptRenderer::split_context();
    let first = renderer.render(&snap, &options(40, 10), None).into_prompt().unwrap();
    let second = renderer.render(&snap, &options(40, 10), None).into_prompt().unwrap();
    assert_eq!(
        (&first.prefix, &first.suffix, &first.context),
        (&second.prefix, &second.suffix, &second.context)
    );
    assert_eq!(first.metadata.render_id + 1, second.metadata.render_id);
}

// ─────────────────────────────────────────────────────────────────────────────
// Suffix cache
// ─────────────────────────────────────────────────────────────────────────────

/// `n` lines `{base}1\n` through `{base}{n}\n`.
fn numbered_lines(n: usize, base: &str) -> String {
    (1..=n).map(|i| format!("{base}{i}\n")).collect()
}

async fn pump_and_render(prompt: &mut VirtualPrompt, data: CompletionRequestData) -> String {
    prompt.create_pipe().pump(data).await.unwrap();
    PromptRenderer::split_context()
        .render(&snapshot(prompt), &options(205, 50), None)
        .into_prompt()
        .unwrap()
        .suffix
}

#[tokio::test]
async fn similar_suffix_keeps_cached_value() {
    let first_suffix = numbered_lines(15, "a") + &numbered_lines(10, "b");
    let second_suffix = numbered_lines(15, "a") + &numbered_lines(10, "c");

    let mut prompt = VirtualPrompt::new(fragment([current_file()])).unwrap();
    let first = pump_and_render(&mut prompt, request(&format!("function f|\n{first_suffix}"))).await;
    assert_eq!(first, first_suffix);

    let second = pump_and_render(&mut prompt, request(&format!("function f|\n{second_suffix}"))).await;
    assert_eq!(second, first_suffix);

    let strict = request(&format!("function f|\n{second_suffix}")).with_suffix_match_threshold(3);
    let third = pump_and_render(&mut prompt, strict).await;
    assert_eq!(third, second_suffix);
}

#[tokio::test]
async fn different_suffix_replaces_cached_value() {
    let first_suffix = numbered_lines(15, "a") + &numbered_lines(10, "b");
    let second_suffix = numbered_lines(3, "a") + &numbered_lines(22, "c");

    let mut prompt = VirtualPrompt::new(fragment([current_file()])).unwrap();
    pump_and_render(&mut prompt, request(&format!("function f|\n{first_suffix}"))).await;
    let second = pump_and_render(&mut prompt, request(&format!("function f|\n{second_suffix}"))).await;
    assert_eq!(second, second_suffix);
}

fn find_node<'a>(node: &'a VirtualNode, name: &str) -> Option<&'a VirtualNode> {
    if node.name() == name {
        return Some(node);
    }
    node.children().iter().find_map(|child| find_node(child, name))
}

#[tokio::test]
async fn rendered_suffix_leaves_after_cursor_clean() {
    let mut prompt = VirtualPrompt::new(current_file()).unwrap();
    prompt.create_pipe().pump(request(DOC)).await.unwrap();
    let _ = snapshot(&mut prompt);

    let dirty = prompt
        .reconciler()
        .with_tree(|root| find_node(root, "AfterCursor").map(VirtualNode::has_changed))
        .unwrap();
    assert_eq!(dirty, Some(false));
}

#[tokio::test]
async fn suffix_on_cursor_line_is_ignored() {
    let prompt = render_split(current_file(), "let x = |foo();\nnext()", &options(100, 20)).await;
    assert_eq!(prompt.prefix, "let x = ");
    assert_eq!(prompt.suffix, "next()");
}
