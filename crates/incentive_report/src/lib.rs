//! Static HTML report generation from an incentive state snapshot.

use incentive::ReportData;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// Render a static HTML report to `out_path`. Embeds the full report JSON for verification.
pub fn render_report(data: &ReportData, out_path: impl AsRef<Path>) -> Result<(), ReportError> {
    let html = build_html(data)?;
    let mut f = std::fs::File::create(out_path.as_ref()).map_err(ReportError::Io)?;
    f.write_all(html.as_bytes()).map_err(ReportError::Io)?;
    Ok(())
}

/// Build HTML string from report data (for testing or in-memory use).
pub fn build_html(data: &ReportData) -> Result<String, ReportError> {
    let snapshot = &data.snapshot;
    let json_embed = escape_html(&serde_json::to_string(data).map_err(ReportError::Json)?);

    let mut periods = String::new();
    for (claim_type, list) in &snapshot.params.reward_periods {
        for p in list {
            row(
                &mut periods,
                &[
                    claim_type.as_str(),
                    &p.source_id,
                    &fmt_time(p.start),
                    &fmt_time(p.end),
                    &p.rewards_per_second.to_string(),
                ],
            )?;
        }
    }

    let mut globals = String::new();
    for record in &snapshot.accumulators {
        let factors = record
            .state
            .indexes
            .iter()
            .map(|(denom, factor)| format!("{denom}={factor}"))
            .collect::<Vec<_>>()
            .join(", ");
        row(
            &mut globals,
            &[
                record.claim_type.as_str(),
                &record.source_id,
                &fmt_time(record.state.previous_accrual_time),
                &factors,
            ],
        )?;
    }

    let mut claims = String::new();
    for claim in &snapshot.claims {
        let reward = if claim.reward.is_empty() {
            "-".to_string()
        } else {
            claim.reward.to_string()
        };
        row(
            &mut claims,
            &[
                claim.claim_type.as_str(),
                &claim.owner,
                &reward,
                &claim.reward_indexes.source_ids().join(", "),
            ],
        )?;
    }

    let mut payouts = String::new();
    for entry in &snapshot.payouts {
        row(
            &mut payouts,
            &[
                &entry.recipient,
                &format!("{}{}", entry.amount, entry.denom),
                &fmt_time(entry.locked_at),
                &fmt_time(entry.unlocks_at),
            ],
        )?;
    }

    let mut failures = String::new();
    for f in &snapshot.failures {
        row(
            &mut failures,
            &[&f.step.to_string(), &f.action.to_string(), &f.reason],
        )?;
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Incentive ledger report</title>
<style>
:root {{ font-family: system-ui, sans-serif; background: #0f1419; color: #e6edf3; }}
body {{ max-width: 960px; margin: 0 auto; padding: 1.5rem; }}
h1 {{ font-size: 1.4rem; margin-bottom: 0.5rem; }}
h2 {{ font-size: 1.1rem; margin-top: 1.5rem; color: #8b949e; }}
.mono {{ font-family: ui-monospace, monospace; font-size: 0.9em; word-break: break-all; }}
.card {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; margin: 0.5rem 0; }}
table {{ width: 100%; border-collapse: collapse; font-size: 0.9rem; }}
th {{ text-align: left; color: #8b949e; font-weight: normal; border-bottom: 1px solid #30363d; }}
td {{ padding: 0.2rem 0.5rem 0.2rem 0; font-family: ui-monospace, monospace; word-break: break-all; }}
.footer {{ margin-top: 2rem; font-size: 0.85rem; color: #8b949e; }}
</style>
</head>
<body>
<h1>Incentive Ledger Report</h1>
<p>Generated: {created}</p>
<p>Claims accepted until: <span class="mono">{claim_end}</span></p>

<h2>Reproducibility</h2>
<div class="card">
  <div class="mono">SHA-256: {hash}</div>
  <p class="footer">Re-run <code>incentive verify --snapshot &lt;file&gt;</code> and compare the hash.</p>
</div>

<h2>Reward periods</h2>
<div class="card"><table>
<tr><th>Category</th><th>Source</th><th>Start</th><th>End</th><th>Per second</th></tr>
{periods}</table></div>

<h2>Global indexes</h2>
<div class="card"><table>
<tr><th>Category</th><th>Source</th><th>Accrued to</th><th>Factors</th></tr>
{globals}</table></div>

<h2>Claims ({claim_count})</h2>
<div class="card"><table>
<tr><th>Category</th><th>Owner</th><th>Unclaimed</th><th>Tracked sources</th></tr>
{claims}</table></div>

<h2>Payouts ({payout_count})</h2>
<div class="card"><table>
<tr><th>Recipient</th><th>Amount</th><th>Locked at</th><th>Unlocks at</th></tr>
{payouts}</table></div>

<h2>Rejected actions ({failure_count})</h2>
<div class="card"><table>
<tr><th>Step</th><th>Action</th><th>Reason</th></tr>
{failures}</table></div>

<h2>Snapshot (embedded)</h2>
<div class="card">
  <p class="footer">The full snapshot is embedded below for verification. Do not edit.</p>
  <script type="application/json" id="state-snapshot">{json_embed}</script>
</div>
</body>
</html>"#,
        created = escape_html(&snapshot.created_utc_rfc3339),
        claim_end = escape_html(&fmt_time(snapshot.params.claim_end)),
        hash = escape_html(&data.reproducibility_hash_sha256),
        claim_count = snapshot.claims.len(),
        payout_count = snapshot.payouts.len(),
        failure_count = snapshot.failures.len(),
    );
    Ok(html)
}

fn row(out: &mut String, cells: &[&str]) -> Result<(), ReportError> {
    out.push_str("<tr>");
    for cell in cells {
        write!(out, "<td>{}</td>", escape_html(cell)).map_err(ReportError::Fmt)?;
    }
    out.push_str("</tr>\n");
    Ok(())
}

fn fmt_time(t: time::OffsetDateTime) -> String {
    t.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| t.to_string())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Fmt(std::fmt::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "io: {}", e),
            ReportError::Json(e) => write!(f, "json: {}", e),
            ReportError::Fmt(e) => write!(f, "format: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}
