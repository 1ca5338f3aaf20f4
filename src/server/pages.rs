//! HTML page rendering for the human-facing views. Plain string templates.

use crate::status::SubmissionView;

const STYLE: &str = r#"
  body { font-family: 'Arial', sans-serif; margin: 40px; background-color: #f7f7f7; color: #333; }
  h1 { color: #4CAF50; }
  a { color: #007bff; }
  table { border-collapse: collapse; width: 100%; background: #fff; }
  th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
  th { background-color: #4CAF50; color: #fff; }
  tr:nth-child(even) { background-color: #f2f2f2; }
  .status-sent { color: #2e7d32; }
  .status-failed { color: #c62828; }
  .status-duplicate { color: #ef6c00; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>"
    )
}

/// `GET /` — landing page.
pub fn index_page() -> String {
    page(
        "Certificate Courier",
        r#"<h1>Certificate Courier</h1>
<p>Watching the submission sheet and emailing completion certificates.</p>
<ul>
  <li><a href="/status">Recent submissions</a></li>
  <li><a href="/admin">Admin</a></li>
  <li><a href="/health">Health (JSON)</a></li>
</ul>"#,
    )
}

/// `GET /admin` — admin overview with the endpoint directory.
pub fn admin_page() -> String {
    page(
        "Admin — Certificate Courier",
        r#"<h1>Admin</h1>
<p>Read-only views over the watcher's state. All data is fetched fresh from the sheet.</p>
<ul>
  <li><a href="/status">Recent submissions</a> — last 10 rows with statuses</li>
  <li><a href="/health">Health</a> — ledger size, high-water mark, in-flight flag</li>
  <li><a href="/processed_users">Processed users</a> — every identity key seen so far</li>
</ul>"#,
    )
}

/// `GET /status` — table of the most recent submissions.
pub fn status_page(submissions: &[SubmissionView]) -> String {
    let mut table = String::from(
        "<h1>Recent Submissions</h1>\n<table>\n<tr>\
         <th>Timestamp</th><th>Email</th><th>Name</th><th>Course</th>\
         <th>Period</th><th>Mobile</th><th>Status</th><th>Processed At</th></tr>\n",
    );
    for s in submissions {
        let class = match s.status.as_str() {
            "Certificate Sent" => " class=\"status-sent\"",
            "Email Failed" => " class=\"status-failed\"",
            "Duplicate - No Certificate Sent" => " class=\"status-duplicate\"",
            _ => "",
        };
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td{}>{}</td><td>{}</td></tr>\n",
            escape(&s.timestamp),
            escape(&s.email),
            escape(&s.name),
            escape(&s.course),
            escape(&s.period),
            escape(&s.mobile),
            class,
            escape(&s.status),
            escape(&s.processed_at),
        ));
    }
    table.push_str("</table>");
    if submissions.is_empty() {
        table.push_str("\n<p>No submissions yet.</p>");
    }
    page("Status — Certificate Courier", &table)
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
