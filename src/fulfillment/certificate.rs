//! Certificate document rendering. Pure string templating — no I/O.

use chrono::Utc;

/// Subject line for the certificate email.
pub const SUBJECT: &str = "Your Certificate of Completion";

/// Plain-text body, used as the fallback part of the multipart message.
pub fn plain_body(full_name: &str, course: &str) -> String {
    format!(
        "Dear {full_name},\n\n\
         Congratulations! You have successfully completed '{course}'.\n\
         Your certificate is included in this email.\n\n\
         Best regards,\nThe Course Team"
    )
}

/// Render the certificate as a standalone HTML document.
///
/// `date_line` is the issue date shown under the signature, e.g. "March 04, 2026".
pub fn render_html(full_name: &str, course: &str, date_line: &str) -> String {
    let name = escape_html(full_name);
    let course = escape_html(course);
    let date = escape_html(date_line);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Your Certificate</title>
<style>
  body {{
    font-family: 'Arial', sans-serif;
    display: flex;
    justify-content: center;
    align-items: center;
    min-height: 100vh;
    background-color: #f0f0f0;
    margin: 0;
  }}
  .certificate-container {{
    background-color: #fff;
    border: 10px solid #4CAF50;
    padding: 40px;
    box-shadow: 0 0 20px rgba(0, 0, 0, 0.1);
    width: 800px;
    max-width: 95%;
    text-align: center;
  }}
  .certificate-title {{ font-size: 2.5em; color: #333; margin-bottom: 20px; }}
  .presented-to {{ font-size: 1.2em; margin-bottom: 10px; }}
  .recipient-name {{ font-size: 2em; font-weight: bold; color: #007bff; margin-bottom: 15px; }}
  .for-completion {{ font-size: 1.2em; margin-bottom: 10px; }}
  .course-name {{ font-size: 1.6em; font-style: italic; color: #555; margin-bottom: 25px; }}
  .signature-area {{ display: flex; justify-content: space-around; margin-top: 30px; }}
  .signature {{ border-top: 2px dashed #ccc; padding-top: 10px; width: 250px; }}
  .date {{ font-size: 0.9em; color: #777; margin-top: 10px; }}
</style>
</head>
<body>
<div class="certificate-container">
  <h2 class="certificate-title">Certificate of Completion</h2>
  <p class="presented-to">This certificate is presented to</p>
  <h1 class="recipient-name">{name}</h1>
  <p class="for-completion">for successfully completing the</p>
  <p class="course-name">{course}</p>
  <div class="signature-area">
    <div class="signature">
      (Signature)
      <p class="date">Date: {date}</p>
    </div>
    <div class="signature">
      (Instructor/Organizer)
      <p class="date"></p>
    </div>
  </div>
</div>
</body>
</html>"#
    )
}

/// Today's issue date in the certificate's display format.
pub fn issue_date() -> String {
    Utc::now().format("%B %d, %Y").to_string()
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
