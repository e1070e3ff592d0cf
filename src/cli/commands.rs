use anyhow::Result;
use colored::Colorize;
use once_cell::sync::Lazy;
use syntect::{
    easy::HighlightLines,
    highlighting::ThemeSet,
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};

use snipshare::models::{EngagementLedger, SharedSnippet};
use snipshare::{ShareError, SharedSnippetApp, SnippetView};

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

fn margin() -> colored::ColoredString {
    "┃".bright_magenta()
}

fn rule() {
    println!("{}", "─".repeat(60).bright_magenta());
}

fn report_error(err: &ShareError) {
    let title = if err.is_unavailable() {
        "SNIPPET NOT FOUND"
    } else {
        "ERROR"
    };
    println!("{}  {}", margin(), title.bright_red().bold());
    println!("{}  {}", margin(), err.user_message());
    if err.is_retryable() {
        println!("{}  {}", margin(), "Try again in a moment.".bright_black());
    }
}

async fn open(app: &mut SharedSnippetApp, link: &str) -> Option<SnippetView> {
    match app.open(link).await {
        Ok(view) => Some(view),
        Err(err) => {
            report_error(&err);
            None
        }
    }
}

/// Shows a shared snippet with its metadata and highlighted code
pub async fn show_snippet(mut app: SharedSnippetApp, link: &str, theme: &str) -> bool {
    let Some(view) = open(&mut app, link).await else {
        return false;
    };

    if let Some(snippet) = &view.snippet {
        display_snippet(snippet, &view, theme);
    }

    app.flush().await;
    true
}

pub async fn like_snippet(mut app: SharedSnippetApp, link: &str) -> bool {
    let Some(before) = open(&mut app, link).await else {
        return false;
    };

    let ok = if before.already_liked {
        println!(
            "{}  {} {}",
            margin(),
            "♥".bright_red(),
            format!("You already liked this snippet ({} likes)", before.likes).bright_black()
        );
        true
    } else {
        match app.like().await {
            Ok(view) => {
                println!(
                    "{}  {} {}",
                    margin(),
                    "♥".bright_red(),
                    format!("Liked! {} likes", view.likes).bright_white()
                );
                true
            }
            Err(err) => {
                report_error(&err);
                false
            }
        }
    };

    app.flush().await;
    ok
}

pub async fn copy_snippet(mut app: SharedSnippetApp, link: &str) -> bool {
    if open(&mut app, link).await.is_none() {
        return false;
    }

    let ok = match app.copy() {
        Ok(view) if view.copied => {
            println!("{}  {}", margin(), "✓ Copied!".bright_green());
            true
        }
        Ok(_) => {
            println!("{}  {}", margin(), "Nothing to copy".bright_black());
            true
        }
        Err(err) => {
            report_error(&err);
            false
        }
    };

    app.flush().await;
    ok
}

pub async fn open_in_editor(mut app: SharedSnippetApp, link: &str) -> bool {
    if open(&mut app, link).await.is_none() {
        return false;
    }

    let ok = match app.editor_route() {
        Ok(route) => {
            println!("{}  {}: {}", margin(), "Run in Compiler".bright_yellow(), route);
            true
        }
        Err(err) => {
            report_error(&err);
            false
        }
    };

    app.flush().await;
    ok
}

/// Lists the IDs of snippets liked from this machine
pub fn list_liked(ledger: &EngagementLedger) -> Result<bool> {
    let ids = ledger.ids()?;

    println!("{}  {}", margin(), "LIKED SNIPPETS".bright_green().bold());
    rule();

    if ids.is_empty() {
        println!("{}  {}", margin(), "No liked snippets yet".bright_black());
        return Ok(true);
    }

    for (idx, id) in ids.iter().enumerate() {
        println!(
            "{}  {}. {}",
            margin(),
            (idx + 1).to_string().yellow(),
            id.bright_white()
        );
    }

    Ok(true)
}

fn display_snippet(snippet: &SharedSnippet, view: &SnippetView, theme: &str) {
    println!(
        "{}  {} {}",
        margin(),
        "SNIPPET".bright_green().bold(),
        snippet.title.bold()
    );
    if let Some(desc) = snippet.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{}  {}", margin(), desc);
    }
    rule();

    let creator = match snippet.profile_route() {
        Some(route) => format!("{} ({})", snippet.creator_display_name(), route),
        None => snippet.creator_display_name().to_string(),
    };
    println!(
        "{}  {}: [{}] {}",
        margin(),
        "Created by".bright_blue(),
        snippet.creator_initial(),
        creator
    );
    println!(
        "{}  {}: {}",
        margin(),
        "Language".bright_yellow(),
        snippet.language.display_name()
    );
    println!(
        "{}  {}: {}   {}: {}",
        margin(),
        "Created".bright_cyan(),
        snippet.created_at.format("%Y-%m-%d"),
        "Updated".bright_cyan(),
        snippet.updated_at.format("%Y-%m-%d")
    );

    let heart = if view.already_liked {
        "♥".bright_red()
    } else {
        "♡".normal()
    };
    println!(
        "{}  {}: {}   {} {}",
        margin(),
        "Views".bright_magenta(),
        view.views,
        heart,
        view.likes
    );
    rule();

    print_highlighted(snippet, theme);

    rule();
    println!(
        "{}  {} {} | {} {}",
        margin(),
        "TIP:".bright_green(),
        format!("snipshare like {}", snippet.shareable_link).bright_white(),
        format!("snipshare copy {}", snippet.shareable_link).bright_white(),
        "to interact".bright_black()
    );
}

fn print_highlighted(snippet: &SharedSnippet, theme: &str) {
    let syntax = SYNTAX_SET
        .find_syntax_by_name(snippet.language.syntax_name())
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

    let Some(theme) = THEME_SET
        .themes
        .get(theme)
        .or_else(|| THEME_SET.themes.get("base16-ocean.dark"))
    else {
        for line in snippet.code.lines() {
            println!("{}  {}", margin(), line);
        }
        return;
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    for (line_num, line) in LinesWithEndings::from(&snippet.code).enumerate() {
        let escaped = match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => as_24_bit_terminal_escaped(&ranges[..], false),
            Err(_) => line.to_string(),
        };
        print!(
            "{}  {:>3} {}\x1b[0m",
            margin(),
            (line_num + 1).to_string().bright_black(),
            escaped
        );
        if !line.ends_with('\n') {
            println!();
        }
    }
}
