use crate::models::{ScoredResult, ScreeningRun};
use crate::utils::{fmt_opt, fmt_pct, fmt_price};

const STYLE: &str = r#"
body{margin:0;padding:24px;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,'Malgun Gothic',sans-serif;color:#1e293b;}
.container{max-width:960px;margin:0 auto;}
.header{background:#1e293b;color:#fff;padding:20px 24px;border-radius:8px;}
.header h1{margin:0 0 6px;font-size:22px;}
.meta{color:#94a3b8;font-size:13px;}
.warning{margin-top:12px;padding:10px 14px;background:#fef3c7;color:#92400e;border-radius:6px;}
.card{background:#fff;margin-top:16px;border-radius:8px;box-shadow:0 1px 3px rgba(0,0,0,0.1);overflow:hidden;}
.card-head{display:flex;gap:10px;align-items:baseline;padding:12px 20px;border-bottom:1px solid #e2e8f0;}
.rank{color:#64748b;font-weight:700;}
.name{font-size:18px;font-weight:700;}
.code{color:#64748b;}
.score{margin-left:auto;background:#3b82f6;color:#fff;padding:2px 10px;border-radius:999px;font-weight:600;}
.price{padding:10px 20px;font-size:16px;}
.up{color:#22c55e;}
.down{color:#ef4444;}
table{width:100%;border-collapse:collapse;}
td{padding:6px 20px;border-top:1px solid #f1f5f9;}
td.label{color:#94a3b8;width:40%;}
.filters{padding:10px 20px;background:#f8fafc;color:#15803d;}
.empty,.skipped{margin-top:16px;padding:16px 20px;background:#fff;border-radius:8px;color:#64748b;}
"#;

/// Minimal escaping for text nodes and double-quoted attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Self-contained page: inline CSS, no scripts, no external assets.
pub fn render_html(run: &ScreeningRun) -> String {
    let meta = &run.meta;
    let title = escape(&format!(
        "{}-day consecutive {} net-buy screen ({})",
        meta.window, meta.investor, meta.market
    ));
    let generated = meta.generated_at.format("%Y-%m-%d %H:%M:%S");
    let summary = format!(
        "{} candidate(s) · {} scored · {} skipped",
        meta.candidate_count,
        run.results.len(),
        run.skipped.len()
    );

    let warning = if meta.partial {
        r#"<div class="warning">Partial result: the run was cancelled before every candidate finished.</div>"#
    } else {
        ""
    };

    let body = if run.results.is_empty() {
        r#"<div class="empty">No consecutive net-buy candidates.</div>"#.to_string()
    } else {
        run.results
            .iter()
            .enumerate()
            .map(|(i, r)| card(i + 1, r))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let skipped = if run.skipped.is_empty() {
        String::new()
    } else {
        let items: String = run
            .skipped
            .iter()
            .map(|s| format!("<li>{}: {}</li>", escape(&s.ticker.to_string()), escape(&s.reason)))
            .collect();
        format!(r#"<div class="skipped"><strong>Skipped</strong><ul>{items}</ul></div>"#)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
  <div class="header">
    <h1>{title}</h1>
    <div class="meta">Generated {generated} · {summary}</div>
    {warning}
  </div>
{body}
{skipped}
</div>
</body>
</html>
"#
    )
}

fn card(rank: usize, r: &ScoredResult) -> String {
    let m = &r.fundamentals;
    let change = r.price.change_pct();
    let change_class = if change > 0.0 {
        "up"
    } else if change < 0.0 {
        "down"
    } else {
        ""
    };
    let pct = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}%", v));

    let rows = [
        ("PER", fmt_opt(m.per)),
        ("PBR", fmt_opt(m.pbr)),
        ("ROE", pct(m.roe)),
        ("Debt ratio", pct(m.debt_ratio)),
        ("Dividend yield", pct(m.dividend_yield_pct)),
        ("Foreign ownership", pct(m.foreign_hold_ratio_pct)),
    ]
    .iter()
    .map(|(label, value)| format!(r#"<tr><td class="label">{label}</td><td>{value}</td></tr>"#))
    .collect::<String>();

    let filters = if r.passed_filters.is_empty() {
        String::new()
    } else {
        let labels: Vec<String> = r.passed_filters.iter().map(|p| p.to_string()).collect();
        format!(r#"<div class="filters">✓ {}</div>"#, escape(&labels.join(", ")))
    };

    format!(
        r#"  <div class="card">
    <div class="card-head"><span class="rank">#{rank}</span><span class="name">{name}</span><span class="code">({code})</span><span class="score">{score}/5</span></div>
    <div class="price">{close} <span class="{change_class}">{change}</span> · 52w high {high} ({ratio:.1}%)</div>
    <table>{rows}</table>
    {filters}
  </div>"#,
        name = escape(&r.ticker.name),
        code = escape(&r.ticker.code),
        score = r.score,
        close = fmt_price(r.price.current_close),
        change = fmt_pct(change),
        high = fmt_price(r.price.high_52_week),
        ratio = r.price_ratio() * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures::{result, run};

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"A&B"</b>"#), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn one_card_per_result_with_escaped_names() {
        let page = render_html(&run(vec![
            result("005930", "삼성전자", 0.0123),
            result("000001", "<script>x</script>", -0.01),
        ]));
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert_eq!(page.matches(r#"<div class="card">"#).count(), 2);
        assert!(page.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains(r#"<span class="up">+1.23%</span>"#));
        assert!(page.contains(r#"<span class="down">-1.00%</span>"#));
        assert!(page.contains("✓ PBR: 0.80, PER: 12.00, ROE: 18.00%"));
        assert!(page.contains(r#"<td class="label">Debt ratio</td><td>N/A</td>"#));
    }

    #[test]
    fn empty_partial_run() {
        let mut r = run(vec![]);
        r.meta.partial = true;
        let page = render_html(&r);
        assert!(page.contains("No consecutive net-buy candidates."));
        assert!(page.contains(r#"class="warning""#));
    }
}
