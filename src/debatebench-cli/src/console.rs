//! Terminal rendering for debates, judging runs and stability reports.

use std::sync::Arc;

use colored::{ColoredString, Colorize};
use debatebench_core::collector::CollectionReport;
use debatebench_core::stability::StabilityMetrics;
use debatebench_core::{
    DebateCallback, DebateEvent, DebateInstance, DebateStatus, ModelAssignment, PublicForumFormat,
    Side, StabilityReport,
};

const WIDTH: usize = 70;

pub fn rule(ch: &str) -> String {
    ch.repeat(WIDTH)
}

pub fn banner(title: &str) {
    println!();
    println!("{}", rule("═").bright_blue());
    println!("{}", format!("  {}", title).bright_blue().bold());
    println!("{}", rule("═").bright_blue());
    println!();
}

fn seat_tag(assignment: ModelAssignment) -> ColoredString {
    match assignment {
        ModelAssignment::Original => "[original]".bright_cyan(),
        ModelAssignment::Flipped => "[flipped]".bright_magenta(),
    }
}

fn side_label(side: Side) -> ColoredString {
    match side {
        Side::Pro => side.as_str().green().bold(),
        Side::Con => side.as_str().red().bold(),
    }
}

/// Prints debate events as they arrive. Both halves of a pair share it, so
/// every line carries its seat tag.
pub fn create_console_callback(show_speeches: bool) -> DebateCallback {
    Arc::new(move |event| match event {
        DebateEvent::DebateStarted {
            model_assignment,
            pro_model,
            con_model,
            ..
        } => {
            println!(
                "{} {} {} vs {} {}",
                seat_tag(model_assignment),
                "PRO".green(),
                pro_model.bright_white(),
                con_model.bright_white(),
                "CON".red()
            );
        }
        DebateEvent::SpeechStarted {
            model_assignment,
            speech_type,
            side,
            model,
            ..
        } => {
            println!(
                "{} {} {} {}",
                seat_tag(model_assignment),
                "▶".bright_cyan(),
                speech_type.to_string().bold(),
                format!("({} / {})", side_label(side), model.dimmed())
            );
        }
        DebateEvent::SpeechComplete {
            model_assignment,
            speech,
            ..
        } => {
            println!(
                "{} {} {} ({} words)",
                seat_tag(model_assignment),
                "✓".bright_green(),
                speech.speech_type,
                speech.word_count
            );
            if show_speeches {
                for line in textwrap(&speech.content, WIDTH - 4).lines() {
                    println!("    {}", line);
                }
                println!();
            }
        }
        DebateEvent::DebateComplete { model_assignment, debate_id } => {
            println!(
                "{} {} {}",
                seat_tag(model_assignment),
                "Debate complete".bright_green().bold(),
                debate_id.to_string().dimmed()
            );
        }
        DebateEvent::DebateError {
            model_assignment,
            error,
            speeches_completed,
            ..
        } => {
            println!(
                "{} {} {} (after {} speeches)",
                seat_tag(model_assignment),
                "Debate failed:".red().bold(),
                error,
                speeches_completed
            );
        }
    })
}

/// Simple text wrapping function.
pub fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();

    for (i, paragraph) in text.lines().enumerate() {
        if i > 0 {
            result.push('\n');
        }
        let mut current_line_len = 0;
        for word in paragraph.split_whitespace() {
            if current_line_len + word.len() + 1 > width && current_line_len > 0 {
                result.push('\n');
                current_line_len = 0;
            }
            if current_line_len > 0 {
                result.push(' ');
                current_line_len += 1;
            }
            result.push_str(word);
            current_line_len += word.len();
        }
    }

    result
}

fn status_label(status: DebateStatus) -> ColoredString {
    match status {
        DebateStatus::Complete => status.to_string().bright_green(),
        DebateStatus::Error => status.to_string().red(),
        _ => status.to_string().yellow(),
    }
}

pub fn print_debate_summary(debate: &DebateInstance) {
    println!(
        "  {} {} {} {} vs {} ({}/6 speeches)",
        seat_tag(debate.model_assignment),
        debate.id.to_string().dimmed(),
        status_label(debate.status),
        debate.pro_model.green(),
        debate.con_model.red(),
        debate.speeches.len()
    );
    if let Some(error) = &debate.error {
        println!("      {}", error.red());
    }
}

/// Full transcript with model names, for humans.
pub fn print_debate(debate: &DebateInstance, format: &PublicForumFormat) {
    banner(&format!("DebateBench - {}", format.display_name()));
    println!("{} {}", "Resolution:".bold(), debate.resolution.bright_white());
    println!("{} {}", "Debate:".bold(), debate.id);
    println!("{} {}", "Pair:".bold(), debate.pair_id);
    println!(
        "{} {}  {} {}",
        "PRO:".green().bold(),
        debate.pro_model,
        "CON:".red().bold(),
        debate.con_model
    );
    println!(
        "{} {}  {} {}  {} {}",
        "Seating:".bold(),
        debate.model_assignment,
        "Style:".bold(),
        debate.prompt_style,
        "Status:".bold(),
        status_label(debate.status)
    );
    if let Some(error) = &debate.error {
        println!("{} {}", "Error:".red().bold(), error);
    }

    for speech in &debate.speeches {
        println!();
        println!("{}", rule("─").dimmed());
        println!(
            "{} {} {}",
            speech.speech_type.to_string().to_uppercase().bold(),
            format!("({} / {})", side_label(speech.side), speech.model).dimmed(),
            format!(
                "{}/{} words",
                speech.word_count,
                format.word_limit(speech.speech_type)
            )
            .dimmed()
        );
        println!();
        for line in textwrap(&speech.content, WIDTH - 4).lines() {
            println!("  {}", line);
        }
    }
    println!();
}

pub fn print_collection_report(report: &CollectionReport) {
    println!();
    println!("{}", rule("─").dimmed());
    println!(
        "{} {} accepted, {} failed attempts ({} parse), {} excluded runs",
        "Judging:".bold(),
        report.records.len().to_string().bright_green(),
        report.failures.len(),
        report.parse_failure_count(),
        report.excluded_count().to_string().yellow()
    );
    if !report.skipped_debates.is_empty() {
        println!(
            "  {} incomplete debates skipped",
            report.skipped_debates.len().to_string().yellow()
        );
    }
}

fn metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
}

fn print_metrics_row(rank: usize, recommended: bool, m: &StabilityMetrics) {
    let marker = if recommended {
        "★".bright_yellow()
    } else {
        " ".normal()
    };
    println!(
        "{} {:>2}. {:<42} {:>7}",
        marker,
        rank,
        m.judge_config.key().bold(),
        metric(m.instability_score).bright_white()
    );
    println!(
        "       flip {}  score var {}  conf var {}  side bias {}  ({} debates, {} judgments, {} excluded)",
        metric(m.flip_rate),
        metric(m.category_variance),
        metric(m.confidence_variance),
        metric(m.side_bias),
        m.debates_judged,
        m.total_judgments,
        m.excluded_runs
    );
}

pub fn print_stability_report(report: &StabilityReport) {
    banner("Judge Stability Ranking");
    if report.rankings.is_empty() {
        println!("{}", "No judgments recorded yet.".yellow());
        return;
    }
    for ranked in &report.rankings {
        print_metrics_row(ranked.rank, ranked.recommended, &ranked.metrics);
    }

    if let Some(best) = report.recommended() {
        println!();
        println!(
            "{} {}",
            "Recommended:".bright_green().bold(),
            best.metrics.judge_config
        );
    }

    if !report.prompt_sensitivity.is_empty() {
        println!();
        println!("{}", "Prompt sensitivity".bold());
        println!("{}", rule("─").dimmed());
        for family in &report.prompt_sensitivity {
            println!(
                "  {} @ {}  mean disagreement {}",
                family.judge_model.bright_cyan(),
                family.temperature,
                metric(family.mean_disagreement_rate)
            );
            for pair in &family.pairs {
                println!(
                    "    {} vs {}: disagreement {}  score delta {}  ({} common debates)",
                    pair.prompt_a,
                    pair.prompt_b,
                    metric(pair.disagreement_rate),
                    metric(pair.avg_score_delta),
                    pair.common_debates
                );
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textwrap_respects_width() {
        let text = "one two three four five six seven eight nine ten";
        let wrapped = textwrap(text, 14);
        assert!(wrapped.lines().all(|l| l.len() <= 14));
        assert_eq!(wrapped.split_whitespace().count(), 10);
    }

    #[test]
    fn test_textwrap_keeps_paragraphs() {
        let wrapped = textwrap("first paragraph\nsecond", 40);
        assert_eq!(wrapped, "first paragraph\nsecond");
    }

    #[test]
    fn test_metric_formatting() {
        assert_eq!(metric(None), "n/a");
        assert_eq!(metric(Some(0.25)), "0.250");
    }
}
