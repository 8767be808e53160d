use chrono::{TimeZone, Utc};

use super::progress::{DEFAULT_STEP, ESTIMATE_CAP, TICK_INTERVAL};
use super::{DashboardState, StatusMessage};
use crate::ingest::{MAX_FILE_BYTES, SUPPORTED_EXTENSIONS};

/// Escape text for use in HTML bodies and quoted attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Human-readable byte size.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn format_timestamp(ts: Option<i64>) -> String {
    ts.and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Everything the dashboard page needs besides the model.
pub struct DashboardPage<'a> {
    pub app_name: &'a str,
    pub csrf_token: &'a str,
    pub drive_enabled: bool,
    pub state: &'a DashboardState,
}

fn status_banner(status: Option<&StatusMessage>) -> String {
    match status {
        Some(status) => format!(
            r#"<div class="status status-{}" role="status">{}</div>"#,
            status.kind.as_str(),
            html_escape(&status.text)
        ),
        None => String::new(),
    }
}

pub fn render_status(state: &DashboardState) -> String {
    status_banner(state.status.as_ref())
}

pub fn render_store_options(state: &DashboardState) -> String {
    if state.stores.is_empty() {
        return r#"<option value="">No vector stores yet</option>"#.to_string();
    }
    state
        .stores
        .iter()
        .map(|store| {
            let selected = if state.selected_store.as_deref() == Some(store.id.as_str()) {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{selected}>{} ({} files)</option>"#,
                html_escape(&store.id),
                html_escape(&store.name),
                store.file_count
            )
        })
        .collect()
}

pub fn render_file_list(state: &DashboardState) -> String {
    if state.files.is_empty() {
        return r#"<p class="empty">No files in this vector store.</p>"#.to_string();
    }

    let rows: String = state
        .files
        .iter()
        .map(|file| {
            let checked = if state.checked.contains(&file.id) {
                " checked"
            } else {
                ""
            };
            format!(
                r#"<tr>
  <td><input type="checkbox" name="file_ids" value="{id}"{checked}></td>
  <td>{name}</td>
  <td>{size}</td>
  <td><span class="badge badge-{status}">{status}</span></td>
  <td>{created}</td>
</tr>"#,
                id = html_escape(&file.id),
                name = html_escape(&file.filename),
                size = format_bytes(file.bytes),
                status = html_escape(&file.status),
                created = format_timestamp(file.created_at),
            )
        })
        .collect();

    format!(
        r#"<table class="files">
<thead><tr><th><input type="checkbox" id="toggle-all"></th><th>Name</th><th>Size</th><th>Status</th><th>Added</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>"#
    )
}

pub fn render_progress(state: &DashboardState) -> String {
    match &state.upload {
        Some(progress) => format!(
            r#"<div class="progress"><progress max="100" value="{}"></progress><span>{}</span></div>"#,
            progress.percent(),
            html_escape(&progress.label())
        ),
        None => String::new(),
    }
}

pub fn render_drive_files(state: &DashboardState, csrf_token: &str) -> String {
    if state.drive_files.is_empty() {
        return String::new();
    }
    let items: String = state
        .drive_files
        .iter()
        .map(|file| {
            let size = file
                .size
                .as_deref()
                .and_then(|s| s.parse::<u64>().ok())
                .map(format_bytes)
                .unwrap_or_else(|| "-".to_string());
            format!(
                r#"<li>
  <form method="post" action="/google-drive/ingest" class="drive-ingest">
    <input type="hidden" name="csrf_token" value="{csrf}">
    <input type="hidden" name="file_id" value="{id}">
    <input type="hidden" name="file_name" value="{name}">
    <span class="drive-name">{name}</span> <span class="drive-meta">{mime} &middot; {size}</span>
    <button type="submit">Import</button>
  </form>
</li>"#,
                csrf = html_escape(csrf_token),
                id = html_escape(&file.id),
                name = html_escape(&file.name),
                mime = html_escape(&file.mime_type),
            )
        })
        .collect();
    format!(r#"<ul class="drive-files">{items}</ul>"#)
}

fn page(app_name: &str, csrf_token: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="csrf-token" content="{csrf}">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/console.css">
</head>
<body>
{body}
<script src="/static/console.js" defer></script>
</body>
</html>"#,
        csrf = html_escape(csrf_token),
        title = html_escape(app_name),
    )
}

pub fn render_login(
    app_name: &str,
    csrf_token: &str,
    error: Option<&str>,
    status: Option<&StatusMessage>,
) -> String {
    let error = error
        .map(|e| format!(r#"<div class="status status-error" role="alert">{}</div>"#, html_escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<main class="card login">
  <h1>{title}</h1>
  {status}{error}
  <form method="post" action="/login">
    <input type="hidden" name="csrf_token" value="{csrf}">
    <label>Username <input type="text" name="username" autocomplete="username" required></label>
    <label>Password <input type="password" name="password" autocomplete="current-password" required></label>
    <button type="submit">Sign in</button>
  </form>
</main>"#,
        title = html_escape(app_name),
        status = status_banner(status),
        csrf = html_escape(csrf_token),
    );
    page(app_name, csrf_token, &body)
}

pub fn render_dashboard(view: &DashboardPage<'_>) -> String {
    let state = view.state;
    let csrf = html_escape(view.csrf_token);
    let accept = SUPPORTED_EXTENSIONS.join(",");
    let max_mb = MAX_FILE_BYTES / (1024 * 1024);
    let selected_name = state
        .selected()
        .map(|s| html_escape(&s.name))
        .unwrap_or_else(|| "No store selected".to_string());

    let drive = if view.drive_enabled {
        format!(
            r#"<section class="card" id="drive">
  <h2>Import from Google Drive</h2>
  <form method="post" action="/google-drive/list" id="drive-list-form">
    <input type="hidden" name="csrf_token" value="{csrf}">
    <input type="text" name="folder_link" placeholder="Folder link or ID" required>
    <button type="submit">List files</button>
  </form>
  <div id="drive-files">{files}</div>
</section>"#,
            files = render_drive_files(state, view.csrf_token),
        )
    } else {
        String::new()
    };

    let delete_action = state
        .selected_store
        .as_deref()
        .map(|id| format!(r#" action="/api/vector-stores/{}/files/delete""#, html_escape(id)))
        .unwrap_or_default();

    let expanded = if state.expanded { "true" } else { "false" };
    let hidden = if state.expanded { "" } else { " hidden" };

    let body = format!(
        r#"<header class="topbar">
  <h1>{title}</h1>
  <form method="post" action="/logout">
    <input type="hidden" name="csrf_token" value="{csrf}">
    <button type="submit" class="link">Sign out</button>
  </form>
</header>
<main>
  <div id="status">{status}</div>

  <section class="card" id="stores">
    <h2>Vector stores</h2>
    <label>Active store <select id="store-select" name="vector_store_id" form="upload-form">{options}</select></label>
    <form method="post" action="/api/vector-stores/create" id="create-store-form">
      <input type="hidden" name="csrf_token" value="{csrf}">
      <input type="text" name="name" placeholder="New store name" required>
      <button type="submit">Create</button>
    </form>
  </section>

  <section class="card" id="upload">
    <h2>Upload documents</h2>
    <form method="post" action="/upload" enctype="multipart/form-data" id="upload-form">
      <input type="hidden" name="csrf_token" value="{csrf}">
      <input type="file" name="file" accept="{accept}" multiple required>
      <button type="submit">Upload</button>
    </form>
    <p class="hint">Allowed: {accept_list}. Max {max_mb} MB per file.</p>
    <div id="upload-progress" data-step="{step}" data-cap="{cap}" data-tick-ms="{tick_ms}">{progress}</div>
  </section>

  <section class="card" id="files">
    <h2><button type="button" id="toggle-files" aria-expanded="{expanded}">Files in {selected}</button></h2>
    <div id="file-panel"{hidden}>
      <form method="post" id="delete-form"{delete_action}>
        <input type="hidden" name="csrf_token" value="{csrf}">
        <div id="file-list">{files}</div>
        <button type="submit" class="danger">Delete selected</button>
      </form>
    </div>
  </section>
  {drive}
</main>"#,
        title = html_escape(view.app_name),
        status = render_status(state),
        options = render_store_options(state),
        accept_list = SUPPORTED_EXTENSIONS.join(", "),
        progress = render_progress(state),
        step = DEFAULT_STEP,
        cap = ESTIMATE_CAP,
        tick_ms = TICK_INTERVAL.as_millis(),
        selected = selected_name,
        files = render_file_list(state),
    );
    page(view.app_name, view.csrf_token, &body)
}
