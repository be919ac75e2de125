//! Internship cards for the terminal.
//!
//! Every listing in the CLI and the browser is drawn by [`render`]; the
//! [`CardVariant`] decides how much of the posting is shown.

use crate::models::InternshipListing;

const COMPACT_DESCRIPTION_CHARS: usize = 150;
const MIN_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVariant {
    /// Title, company, badges and a short excerpt.
    Compact,
    /// Everything in the posting, wrapped to width.
    Detailed,
}

/// Render a listing as lines no wider than `width` columns.
pub fn render(listing: &InternshipListing, variant: CardVariant, width: usize) -> Vec<String> {
    let width = width.max(MIN_WIDTH);
    let i = &listing.internship;
    let mut lines = Vec::new();

    lines.extend(wrap(&format!("#{} {}", i.id, i.title), width));
    lines.push(truncate(&listing.company.company_name, width));
    lines.push(truncate(&badges(listing).join(" · "), width));

    match variant {
        CardVariant::Compact => {
            lines.extend(wrap(&truncate(&i.description, COMPACT_DESCRIPTION_CHARS), width));
            if let Some(deadline) = &i.application_deadline {
                lines.push(format!("Apply by {}", deadline));
            }
        }
        CardVariant::Detailed => {
            lines.push(String::new());
            lines.extend(wrap(&i.description, width));
            section(&mut lines, "Requirements", i.requirements.as_deref(), width);
            section(&mut lines, "Duration", i.duration.as_deref(), width);
            section(&mut lines, "Compensation", i.salary_info.as_deref(), width);
            lines.push(String::new());
            if let Some(deadline) = &i.application_deadline {
                lines.push(format!("Deadline: {}", deadline));
            }
            lines.push(format!("Posted: {}", date_part(&i.created_at)));
            if !i.is_active {
                lines.push("No longer accepting applications".to_string());
            }
        }
    }

    lines
}

fn badges(listing: &InternshipListing) -> Vec<String> {
    let i = &listing.internship;
    let mut out = vec![if i.is_remote {
        "Remote".to_string()
    } else {
        i.location.clone()
    }];
    out.push(if i.is_paid { "Paid" } else { "Unpaid" }.to_string());
    if let Some(industry) = i.industry.as_ref().or(listing.company.industry.as_ref()) {
        out.push(industry.clone());
    }
    out
}

fn section(lines: &mut Vec<String>, heading: &str, body: Option<&str>, width: usize) {
    let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
        return;
    };
    lines.push(String::new());
    lines.push(format!("{}:", heading));
    lines.extend(wrap(body, width.saturating_sub(2)).into_iter().map(|l| format!("  {}", l)));
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width)
        .into_iter()
        .map(|l| l.into_owned())
        .collect()
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split(['T', ' ']).next().unwrap_or(timestamp)
}

/// Cut `s` to at most `max` characters, ending in "..." when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanySummary, Internship};

    fn listing() -> InternshipListing {
        InternshipListing {
            internship: Internship {
                id: 7,
                company_id: 1,
                title: "Backend Intern".to_string(),
                description: "Build services in Rust. ".repeat(20),
                requirements: Some("Curiosity".to_string()),
                duration: Some("3 months".to_string()),
                is_paid: true,
                salary_info: None,
                location: "Remote".to_string(),
                is_remote: true,
                industry: None,
                is_active: true,
                application_deadline: Some("2030-01-31".to_string()),
                created_at: "2026-10-01 09:30:00".to_string(),
                updated_at: "2026-10-01 09:30:00".to_string(),
            },
            company: CompanySummary {
                company_name: "Acme".to_string(),
                logo_url: None,
                industry: Some("Software".to_string()),
            },
        }
    }

    #[test]
    fn test_compact_card() {
        let lines = render(&listing(), CardVariant::Compact, 60);
        assert_eq!(lines[0], "#7 Backend Intern");
        assert_eq!(lines[1], "Acme");
        assert_eq!(lines[2], "Remote · Paid · Software");
        assert!(lines.iter().any(|l| l.ends_with("...")));
        assert_eq!(lines.last().unwrap(), "Apply by 2030-01-31");
        assert!(!lines.iter().any(|l| l.contains("Curiosity")));
    }

    #[test]
    fn test_detailed_card() {
        let lines = render(&listing(), CardVariant::Detailed, 60);
        assert!(lines.iter().all(|l| l.chars().count() <= 60));
        assert!(lines.contains(&"Requirements:".to_string()));
        assert!(lines.contains(&"  Curiosity".to_string()));
        assert!(!lines.contains(&"Compensation:".to_string()));
        assert!(lines.contains(&"Posted: 2026-10-01".to_string()));
    }

    #[test]
    fn test_closed_posting_is_marked() {
        let mut l = listing();
        l.internship.is_active = false;
        let lines = render(&l, CardVariant::Detailed, 60);
        assert_eq!(lines.last().unwrap(), "No longer accepting applications");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
