//! HTML rendering of a trends digest email.

use crate::domain::trend_category::TrendCategory;
use crate::domain::trend_entry::{TrendEntry, TrendsReport};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\s][^*]*?)\*").unwrap());
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,3})\s+(.*)$").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[*-]\s+(.*)$").unwrap());
static ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());

pub fn render_newsletter_html(
    category: TrendCategory,
    subcategory_name: &str,
    report: &TrendsReport,
) -> String {
    let date = format_generation_date(report.generated_at.as_deref());
    let title = format!("{} Trends", category.display_name());

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
</head>
<body style="margin:0;padding:0;background-color:#f4f4f7;font-family:Helvetica,Arial,sans-serif;color:#333333;">
<div style="max-width:640px;margin:0 auto;background-color:#ffffff;">
<div style="background-color:#1a1a2e;color:#ffffff;padding:32px 24px;text-align:center;">
<h1 style="margin:0;font-size:28px;">{title}</h1>
<p style="margin:8px 0 0;font-size:16px;">{subcategory}</p>
<p style="margin:4px 0 0;font-size:13px;color:#c9c9d9;">{date}</p>
</div>
"#,
        title = escape_html(&title),
        subcategory = escape_html(subcategory_name),
        date = date,
    );

    for trend in &report.trends {
        html.push_str(&render_trend_card(trend));
    }

    html.push_str(&render_references(
        &report.unique_references(),
        "Sources &amp; References",
        TextDirection::Ltr,
    ));

    let _ = write!(
        html,
        r#"<div style="background-color:#f4f4f7;padding:24px;text-align:center;font-size:12px;color:#8a8a9a;">
<p style="margin:0;">You are receiving this email because you are subscribed to {category} trend updates.</p>
<p style="margin:8px 0 0;">Generated on {date}</p>
</div>
</div>
</body>
</html>
"#,
        category = category.display_name(),
        date = date,
    );

    html
}

/// Writing direction of a newsletter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Accepts language names ("Hebrew") and ISO 639-1 codes ("he").
    pub fn of(language: &str) -> Self {
        match language.trim().to_lowercase().as_str() {
            "hebrew" | "he" | "arabic" | "ar" | "persian" | "farsi" | "fa" | "urdu" | "ur" => {
                TextDirection::Rtl
            }
            _ => TextDirection::Ltr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }

    fn align(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "left",
            TextDirection::Rtl => "right",
        }
    }
}

/// Fixed wording of the overview email.
struct OverviewLabels {
    lang: &'static str,
    subtitle: &'static str,
    visual_inspiration: &'static str,
    references: &'static str,
    footer: &'static str,
}

impl OverviewLabels {
    fn for_language(language: &str) -> Self {
        match language.trim().to_lowercase().as_str() {
            "hebrew" | "he" => OverviewLabels {
                lang: "he",
                subtitle: "סקירת טרנדים שבועית",
                visual_inspiration: "השראה ויזואלית",
                references: "מקורות ומראי מקום",
                footer: "מופעל על ידי מחקר טרנדים מונחה בינה מלאכותית",
            },
            other => OverviewLabels {
                lang: match other {
                    "arabic" | "ar" => "ar",
                    "persian" | "farsi" | "fa" => "fa",
                    "urdu" | "ur" => "ur",
                    _ => "en",
                },
                subtitle: "Your weekly trends overview",
                visual_inspiration: "Visual Inspiration",
                references: "Sources &amp; References",
                footer: "Powered by AI-driven trend research",
            },
        }
    }
}

/// Renders an overview digest: one card per category of the overview,
/// headed by the category name, laid out for the language's direction.
pub fn render_overview_html(
    category: TrendCategory,
    language: &str,
    report: &TrendsReport,
) -> String {
    let direction = TextDirection::of(language);
    let labels = OverviewLabels::for_language(language);
    let date = format_generation_date(report.generated_at.as_deref());
    let title = format!("Weekly {} Trends Overview", category.display_name());

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="{lang}" dir="{dir}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
</head>
<body style="margin:0;padding:0;background-color:#f8f9fa;font-family:Helvetica,Arial,sans-serif;color:#333333;">
<div style="max-width:800px;margin:0 auto;background-color:#ffffff;" dir="{dir}">
<div style="padding:48px 24px 32px;text-align:center;">
<h1 style="margin:0 0 12px;font-size:36px;color:#1a1a1a;">{title}</h1>
<p style="margin:0;font-size:18px;color:#666666;">{subtitle}</p>
<p style="margin:12px 0 0;font-size:14px;color:#999999;">{date}</p>
</div>
"#,
        lang = labels.lang,
        dir = direction.as_str(),
        title = escape_html(&title),
        subtitle = labels.subtitle,
        date = date,
    );

    for entry in &report.trends {
        html.push_str(&render_overview_card(entry, direction, &labels));
    }

    html.push_str(&render_references(
        &report.unique_references(),
        labels.references,
        direction,
    ));

    let _ = write!(
        html,
        r#"<div style="background-color:#1a1a1a;padding:32px 24px;text-align:center;font-size:12px;color:#999999;">
<p style="margin:0 0 8px;font-size:14px;color:#ffffff;">{footer}</p>
<p style="margin:0;">Generated on {date}</p>
</div>
</div>
</body>
</html>
"#,
        footer = labels.footer,
        date = date,
    );

    html
}

fn render_overview_card(
    entry: &TrendEntry,
    direction: TextDirection,
    labels: &OverviewLabels,
) -> String {
    let heading = entry
        .category_name
        .clone()
        .unwrap_or_else(|| format!("Trend #{}", entry.number));
    let align = direction.align();

    let mut card = String::new();
    let _ = write!(
        card,
        r#"<div style="margin:0 24px 24px;padding:32px;background-color:#fafafa;border-radius:8px;">
<h2 style="margin:0 0 24px;font-size:14px;color:#999999;text-transform:uppercase;letter-spacing:1px;text-align:{align};">{heading}</h2>
<div style="font-size:16px;line-height:1.8;text-align:{align};direction:{dir};">
{description}</div>
"#,
        align = align,
        heading = escape_html(&heading),
        dir = direction.as_str(),
        description = markdown_to_html(&entry.description),
    );

    if !entry.image_urls.is_empty() {
        let _ = writeln!(
            card,
            r#"<h3 style="margin:24px 0 16px;font-size:20px;color:#1a1a1a;text-align:{};">{}</h3>"#,
            align, labels.visual_inspiration
        );
        for url in &entry.image_urls {
            let _ = writeln!(
                card,
                r#"<img src="{}" alt="{}" style="width:100%;height:auto;display:block;border-radius:8px;margin-bottom:8px;">"#,
                escape_html(url),
                escape_html(&heading)
            );
        }
    }

    card.push_str("</div>\n");
    card
}

/// The deduplicated source list, or nothing when there are no sources.
fn render_references(references: &[&str], title: &str, direction: TextDirection) -> String {
    if references.is_empty() {
        return String::new();
    }

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div style="padding:24px;border-top:1px solid #e5e5ea;text-align:{align};">
<h2 style="font-size:18px;margin:0 0 12px;">{title}</h2>
<ol style="padding-inline-start:20px;margin:0;font-size:13px;">
"#,
        align = direction.align(),
        title = title,
    );
    for reference in references {
        let _ = writeln!(
            html,
            r#"<li style="margin-bottom:6px;">{}</li>"#,
            render_reference(reference)
        );
    }
    html.push_str("</ol>\n</div>\n");
    html
}

/// Only `http(s)` references become links; anything else is plain text.
fn render_reference(reference: &str) -> String {
    let escaped = escape_html(reference);
    if is_web_url(reference) {
        format!(
            r#"<a href="{0}" style="color:#4a4ae8;word-break:break-all;">{0}</a>"#,
            escaped
        )
    } else {
        format!(r#"<span style="word-break:break-all;">{}</span>"#, escaped)
    }
}

fn is_web_url(reference: &str) -> bool {
    let reference = reference.to_ascii_lowercase();
    reference.starts_with("https://") || reference.starts_with("http://")
}

fn render_trend_card(trend: &TrendEntry) -> String {
    let mut card = String::new();
    let _ = write!(
        card,
        r#"<div style="padding:24px;border-top:1px solid #e5e5ea;">
<h2 style="font-size:20px;margin:0 0 16px;color:#1a1a2e;">Trend #{}</h2>
"#,
        trend.number
    );

    match trend.image_urls.as_slice() {
        [] => {}
        [single] => {
            let _ = writeln!(
                card,
                r#"<img src="{}" alt="Trend {}" style="width:100%;height:auto;border-radius:8px;margin-bottom:16px;">"#,
                escape_html(single),
                trend.number
            );
        }
        many => {
            for (index, url) in many.iter().enumerate() {
                let _ = writeln!(
                    card,
                    r#"<img src="{}" alt="Trend {} image {}" style="width:100%;height:auto;border-radius:8px;margin-bottom:8px;display:block;">"#,
                    escape_html(url),
                    trend.number,
                    index + 1
                );
            }
        }
    }

    let _ = write!(
        card,
        "<div style=\"font-size:15px;line-height:1.6;\">\n{}</div>\n</div>\n",
        markdown_to_html(&trend.description)
    );
    card
}

/// "October 20, 2025" for an RFC 3339 timestamp, today's date otherwise.
pub fn format_generation_date(generated_at: Option<&str>) -> String {
    generated_at
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
        .format("%B %-d, %Y")
        .to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn inline_markdown(text: &str) -> String {
    let escaped = escape_html(text);
    let bold = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

#[derive(PartialEq)]
enum Block {
    None,
    Paragraph,
    Bullets,
    Ordered,
}

/// Converts the small markdown subset the research API produces.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut html = String::new();
    let mut block = Block::None;
    let mut paragraph: Vec<String> = Vec::new();

    fn close(html: &mut String, block: &mut Block, paragraph: &mut Vec<String>) {
        match block {
            Block::Paragraph => {
                let _ = writeln!(html, "<p>{}</p>", paragraph.join("<br>"));
                paragraph.clear();
            }
            Block::Bullets => html.push_str("</ul>\n"),
            Block::Ordered => html.push_str("</ol>\n"),
            Block::None => {}
        }
        *block = Block::None;
    }

    for line in markdown.lines().map(str::trim) {
        if line.is_empty() {
            close(&mut html, &mut block, &mut paragraph);
        } else if let Some(captures) = HEADER.captures(line) {
            close(&mut html, &mut block, &mut paragraph);
            let level = captures[1].len() + 2;
            let _ = writeln!(html, "<h{0}>{1}</h{0}>", level, inline_markdown(&captures[2]));
        } else if let Some(captures) = BULLET.captures(line) {
            if block != Block::Bullets {
                close(&mut html, &mut block, &mut paragraph);
                html.push_str("<ul>\n");
                block = Block::Bullets;
            }
            let _ = writeln!(html, "<li>{}</li>", inline_markdown(&captures[1]));
        } else if let Some(captures) = ORDERED.captures(line) {
            if block != Block::Ordered {
                close(&mut html, &mut block, &mut paragraph);
                html.push_str("<ol>\n");
                block = Block::Ordered;
            }
            let _ = writeln!(html, "<li>{}</li>", inline_markdown(&captures[1]));
        } else {
            if block != Block::Paragraph {
                close(&mut html, &mut block, &mut paragraph);
                block = Block::Paragraph;
            }
            paragraph.push(inline_markdown(line));
        }
    }
    close(&mut html, &mut block, &mut paragraph);

    html
}
