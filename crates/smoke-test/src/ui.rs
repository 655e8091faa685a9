//! Console rendering for run reports.

use colored::Colorize;

use crate::validation::{RunReport, Severity, Subsystem, Verdict};

/// Print the run banner.
pub fn print_banner(target: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", "  Cluster Smoke Test".cyan().bold());
    println!("  {}", target.bright_black());
    println!("{}", "═".repeat(70).bright_black());
}

/// Print a subsystem header.
pub fn print_subsystem(subsystem: Subsystem) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", subsystem.title().cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
}

/// Print a section title within a subsystem.
pub fn print_section(title: &str) {
    println!();
    println!("{} {}", "▶".cyan(), title.bold());
}

/// Print one check result.
pub fn print_outcome(severity: Severity, label: &str) {
    match severity {
        Severity::Pass => println!("  {} {}", "✓".green().bold(), label.green()),
        Severity::Warning => println!("  {} {}", "⚠".yellow().bold(), label.yellow()),
        Severity::Fail => println!("  {} {}", "✗".red().bold(), label.red()),
    }
}

/// Print the closing totals.
pub fn print_summary(verdict: &Verdict) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", "SUMMARY".cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!(
        "  {} {}",
        "Passed:  ".bright_black(),
        verdict.pass_count.to_string().green()
    );
    println!(
        "  {} {}",
        "Failed:  ".bright_black(),
        verdict.fail_count.to_string().red()
    );
    println!(
        "  {} {}",
        "Warnings:".bright_black(),
        verdict.warn_count.to_string().yellow()
    );
    println!("  {} {}", "Total:   ".bright_black(), verdict.total());
    println!();

    if verdict.overall_failed {
        println!(
            "{} {}",
            "✗".red().bold(),
            "Smoke test FAILED".red().bold()
        );
    } else if verdict.warn_count > 0 {
        println!(
            "{} {}",
            "⚠".yellow().bold(),
            "Smoke test passed with warnings".yellow().bold()
        );
    } else {
        println!(
            "{} {}",
            "✓".green().bold(),
            "Smoke test PASSED".green().bold()
        );
    }
}

/// Print the whole report grouped by subsystem and section.
pub fn print_report(report: &RunReport) {
    for subsystem in Subsystem::ALL {
        let mut outcomes = report.for_subsystem(subsystem).peekable();
        if outcomes.peek().is_none() {
            continue;
        }
        print_subsystem(subsystem);

        let mut section: Option<&str> = None;
        for entry in outcomes {
            if section != Some(entry.section.as_str()) {
                if !entry.section.is_empty() {
                    print_section(&entry.section);
                }
                section = Some(entry.section.as_str());
            }
            print_outcome(entry.outcome.severity, &entry.outcome.label);
        }
    }

    print_summary(&report.verdict);
}
