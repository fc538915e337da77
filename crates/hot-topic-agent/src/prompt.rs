//! System prompt builder for the Topic Agent.

use chrono::NaiveDate;

use hot_topic_core::types::DATE_FORMAT;
use hot_topic_tools::ToolRegistry;

/// Built-in persona. Output is read aloud, so it forbids markup.
pub const DEFAULT_PERSONA: &str = "\
■ペルソナ
あなたは最先端の技術に詳しい、経験豊富なWebエンジニアです。

■話し方
必ず日本語で答えてください。
内容は淡々と、しかし丁寧で明るく親しみやすい口調で伝えてください。
冒頭は挨拶を含めて1行程度にまとめます（例:「こんにちは、今日のエンジニア界隈の話題をお届けします」）。
自己紹介や感想、個人的な経験談は不要です。
結果は音声で読み上げられます。# や * や - などの記号は使わず、読み上げて自然な文章にしてください。
見つかった話題だけを伝え、見つからなかったキーワードについては触れないでください。
全体で300文字以内に要約してください。

■ツールの使い方
必ず live_search ツールで最新のXの投稿を検索してください。
ユーザーが日付を指定した場合（例:「2024-10-03の開発関連トピックを調べて教えて」）は、その日付を target_date に設定します。
日付の指定がなければ target_date を空にして、今日を対象に検索します。
Web・システム開発に関する話題（技術、トレンド、サービス、ニュース、ライブラリ、フレームワーク、AI、エンジニアのキャリアなど）から、
いまエンジニアが関心を持ちそうな具体的な技術名やキーワード（React、TypeScript、Next.js、Go、Rust、AI開発など）を自分で考えてクエリにしてください。
1回の検索につきキーワードは1つだけにし、「トレンド」「最新技術」のような抽象的な語は使わないでください。
min_favorites は 10 以上、min_views は 100 以上を指定してください。
3〜5件程度を選び、元の投稿内容（原文と日本語訳）と、いいね数や返信などの反響を含めて紹介してください。
反響の大きい投稿を優先し、エンジニアにとって有用で興味深い情報を選んでください。

■注意
指定された日付が未来であっても、そのまま live_search ツールを使ってください。";

/// Build the system prompt for one run.
///
/// `persona` replaces [`DEFAULT_PERSONA`] when set.
pub fn build_system_prompt(persona: Option<&str>, tools: &ToolRegistry, today: NaiveDate) -> String {
    let mut parts = vec![persona.unwrap_or(DEFAULT_PERSONA).to_string()];

    parts.push(format!("今日の日付: {}", today.format(DATE_FORMAT)));

    let tool_names = tools.list();
    if !tool_names.is_empty() {
        parts.push(format!("Available tools: {}", tool_names.join(", ")));
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hot_topic_core::config::Config;
    use hot_topic_core::types::parse_date;

    #[test]
    fn test_default_persona_and_date() {
        let tools = ToolRegistry::with_live_search(&Config::default());
        let prompt = build_system_prompt(None, &tools, parse_date("2025-01-15").unwrap());
        assert!(prompt.contains("300文字以内"));
        assert!(prompt.contains("今日の日付: 2025-01-15"));
        assert!(prompt.contains("Available tools: live_search"));
    }

    #[test]
    fn test_persona_overrides_default() {
        let tools = ToolRegistry::new();
        let prompt = build_system_prompt(
            Some("You are a terse release-notes reader."),
            &tools,
            parse_date("2025-01-15").unwrap(),
        );
        assert!(prompt.starts_with("You are a terse release-notes reader."));
        assert!(!prompt.contains("■ペルソナ"));
        assert!(!prompt.contains("Available tools"));
    }
}
