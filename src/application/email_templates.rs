use url::Url;

use crate::{
    domain::entities::waitlist_email::WaitlistEmailKind, use_cases::waitlist::EnrollmentResult,
};

const BRAND_NAME: &str = "Waitlist";

fn origin_label(app_origin: &str) -> String {
    Url::parse(app_origin)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()))
        .unwrap_or_else(|| app_origin.to_string())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

pub fn primary_button(url: &str, label: &str) -> String {
    format!(
        r#"<a href="{url}" style="display:inline-block;padding:12px 18px;background-color:#2563eb;color:#ffffff;text-decoration:none;border-radius:8px;font-weight:600;">{label}</a>"#
    )
}

/// Subject and HTML body for one kind of waitlist message.
pub fn render_email(
    kind: WaitlistEmailKind,
    app_origin: &str,
    result: &EnrollmentResult,
    share_url: &str,
) -> (String, String) {
    match kind {
        WaitlistEmailKind::Welcome | WaitlistEmailKind::ImmediateWelcome => {
            welcome_email(app_origin, result, share_url)
        }
        WaitlistEmailKind::SneakPeek => sneak_peek_email(app_origin, result),
        WaitlistEmailKind::Collaboration => collaboration_email(app_origin, result, share_url),
        WaitlistEmailKind::Launch => launch_email(app_origin, result),
    }
}

fn greeting(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("Hi {}!", escape_html(name)),
        None => "Hi!".to_string(),
    }
}

fn site_link(app_origin: &str, path: &str) -> String {
    format!("{}/{path}", app_origin.trim_end_matches('/'))
}

fn highlight_box(title: &str, inner_html: &str) -> String {
    format!(
        r#"<div style="background-color:#dbeafe;padding:20px;border-radius:8px;margin:16px 0;">
        <p style="margin:0 0 8px;color:#1e40af;font-weight:600;">{title}</p>
        {inner_html}
      </div>"#
    )
}

fn bullet_list(items: &[&str]) -> String {
    let items: String = items
        .iter()
        .map(|item| format!(r#"<li style="margin:4px 0;">{item}</li>"#))
        .collect();
    format!(r#"<ul style="margin:0;padding-left:20px;color:#374151;">{items}</ul>"#)
}

/// Subject and HTML body of the message sent right after someone joins.
pub fn welcome_email(app_origin: &str, result: &EnrollmentResult, share_url: &str) -> (String, String) {
    let subject = "You're in! Welcome to the waitlist".to_string();
    let headline = match result.name.as_deref() {
        Some(name) => format!("Welcome aboard, {}!", escape_html(name)),
        None => "Welcome aboard!".to_string(),
    };
    let lead = "You've secured your spot on the early access list.";
    let button = primary_button(share_url, "Share your link");
    // Unranked entries have no position worth showing.
    let position = if result.position > 0 {
        format!(
            r#"<p style="margin:0;color:#1e40af;font-weight:600;">Your waitlist position</p>
        <p style="margin:4px 0 12px;font-size:24px;font-weight:bold;color:#2563eb;">#{}</p>"#,
            result.position
        )
    } else {
        String::new()
    };
    let body = format!(
        r#"<div style="background-color:#dbeafe;padding:20px;border-radius:8px;margin:16px 0;">
        {position}
        <p style="margin:0 0 12px;color:#374151;">Share your referral code to move up: <strong>{code}</strong></p>
        {button}
      </div>
      <p style="margin:12px 0 0;color:#374151;">We'll let you know the moment early access opens.</p>"#,
        code = escape_html(&result.referral_code),
    );
    let reason = "you joined the waitlist";

    let html = wrap_email(app_origin, &headline, lead, &body, reason);
    (subject, html)
}

pub fn sneak_peek_email(app_origin: &str, result: &EnrollmentResult) -> (String, String) {
    let subject = "Sneak peek: stop juggling tools, just write".to_string();
    let headline = greeting(result.name.as_deref());
    let lead = "You joined because you're tired of tool overload. Here is a quick look at one \
                of the features that keeps everything in one place.";
    let features = bullet_list(&[
        "Paste a DOI or URL and get a correctly formatted reference",
        "Insert it into your text with one click",
        "Format the whole bibliography in seconds",
    ]);
    let feedback = primary_button(&site_link(app_origin, "feedback"), "Share your feedback");
    let body = format!(
        r#"{highlight}
      <p style="margin:12px 0;color:#374151;"><strong>A quick question:</strong> what is the one feature you must have in a writing tool?</p>
      {feedback}"#,
        highlight = highlight_box("The citation manager", &features),
    );

    let html = wrap_email(app_origin, &headline, lead, &body, "you signed up for the waitlist");
    (subject, html)
}

pub fn collaboration_email(
    app_origin: &str,
    result: &EnrollmentResult,
    share_url: &str,
) -> (String, String) {
    let subject = "Collaboration made easy (bring your team)".to_string();
    let headline = greeting(result.name.as_deref());
    let lead = "Research isn't a solo sport, so real-time collaboration is built in.";
    let features = bullet_list(&[
        "See your co-authors' changes live",
        "Leave comments linked to specific citations",
        "Keep a version history you can trust",
    ]);
    let button = primary_button(share_url, "Share with your team");
    let body = format!(
        r#"{highlight}
      <p style="margin:12px 0;color:#374151;">Every friend you refer helps open early access sooner. Share your link with classmates and colleagues:</p>
      {button}
      <p style="margin:12px 0 0;font-size:13px;color:#4b5563;word-break:break-all;">{link}</p>"#,
        highlight = highlight_box("Real-time collaboration", &features),
        link = escape_html(share_url),
    );

    let html = wrap_email(app_origin, &headline, lead, &body, "you signed up for the waitlist");
    (subject, html)
}

pub fn launch_email(app_origin: &str, result: &EnrollmentResult) -> (String, String) {
    let subject = "The doors are open! Your early access is here".to_string();
    let headline = greeting(result.name.as_deref());
    let lead = "The wait is over. Early access is open and your spot is ready.";
    let perks = bullet_list(&[
        "30% lifetime discount on all paid plans",
        "Priority support",
        "First access to new features",
        "A direct line to the product team",
    ]);
    let button = primary_button(&site_link(app_origin, "signup"), "Claim your access");
    let body = format!(
        r#"<div style="margin:20px 0;">{button}</div>
      {highlight}"#,
        highlight = highlight_box("As an early access member you get", &perks),
    );

    let html = wrap_email(app_origin, &headline, lead, &body, "you signed up for the waitlist");
    (subject, html)
}

pub fn wrap_email(app_origin: &str, headline: &str, lead: &str, body_html: &str, reason: &str) -> String {
    let origin = origin_label(app_origin);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <body style="background:#f8fafc;margin:0;padding:24px;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:560px;margin:0 auto;background:#ffffff;border:1px solid #e5e7eb;border-radius:12px;padding:24px;">
      <div style="font-size:12px;letter-spacing:0.08em;text-transform:uppercase;color:#6b7280;">{brand} - {origin}</div>
      <h1 style="margin:12px 0 8px;font-size:22px;color:#111827;">{headline}</h1>
      <p style="margin:0 0 12px;font-size:15px;color:#111827;line-height:1.6;">{lead}</p>
      {body_html}
      <div style="margin-top:20px;padding-top:16px;border-top:1px solid #e5e7eb;">
        <p style="margin:0;font-size:13px;color:#4b5563;">Why you got this email: {reason}.</p>
      </div>
    </div>
  </body>
</html>
"#,
        brand = BRAND_NAME,
    )
}
