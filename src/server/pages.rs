//! HTML pages for the gallery, upload, account and admin views.

use axum::http::StatusCode;
use chrono::{DateTime, FixedOffset, Utc};
use url::form_urlencoded;

use super::auth::CurrentUser;
use crate::gallery::{GalleryPage, PhotoRecord, TagVocabulary};

/// Escape HTML special characters to prevent XSS attacks.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Upload time in the display time zone.
fn display_time(time: &DateTime<Utc>, offset: &FixedOffset) -> String {
    time.with_timezone(offset).format("%Y-%m-%d %H:%M").to_string()
}

/// Link to a gallery page with a tag filter.
pub fn gallery_href(tags: &[String], page: usize) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !tags.is_empty() {
        query.append_pair("tags", &tags.join(","));
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        "/".to_string()
    } else {
        format!("/?{}", query)
    }
}

/// `active` with `tag` added, or removed if already present.
fn toggle_tag(active: &[String], tag: &str) -> Vec<String> {
    if active.iter().any(|t| t == tag) {
        active.iter().filter(|t| *t != tag).cloned().collect()
    } else {
        let mut tags = active.to_vec();
        tags.push(tag.to_string());
        tags
    }
}

fn message_banner(message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<p class="message">{}</p>"#, html_escape(m)))
        .unwrap_or_default()
}

fn delete_form(photo: &PhotoRecord, next: &str) -> String {
    format!(
        r#"<form method="post" action="/admin/photos/{id}/delete" class="delete">
            <input type="hidden" name="next" value="{next}">
            <button type="submit">Delete</button>
        </form>"#,
        id = html_escape(&urlencoding::encode(&photo.id)),
        next = html_escape(next),
    )
}

fn lightbox_anchor(photo: &PhotoRecord) -> String {
    format!("view-{}", html_escape(&photo.id))
}

/// Full-size overlay shown while its anchor is the URL fragment.
fn lightbox(photo: &PhotoRecord) -> String {
    format!(
        r##"
        <div id="{anchor}" class="lightbox">
            <a href="#" class="close" aria-label="Close"></a>
            <img src="{src}" alt="{alt}">
            <a href="{src}" class="download" download>Download</a>
        </div>"##,
        anchor = lightbox_anchor(photo),
        src = html_escape(&photo.filepath),
        alt = html_escape(&photo.tags.join(", ")),
    )
}

fn tag_chips(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!(r#"<span class="tag">{}</span>"#, html_escape(t)))
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Layout
// =============================================================================

/// Wrap page content in the shared document shell and navigation.
pub fn layout(title: &str, user: Option<&CurrentUser>, body: &str) -> String {
    let account = match user {
        Some(user) => {
            let admin = if user.is_admin {
                r#"<a href="/admin">Admin</a>"#
            } else {
                ""
            };
            format!(
                r#"<span class="who">{name}</span>
                <a href="/mypage">My page</a>
                {admin}
                <form method="post" action="/logout" class="inline"><button type="submit">Sign out</button></form>"#,
                name = html_escape(user.display_name()),
                admin = admin,
            )
        }
        None => r#"<a href="/login">Sign in</a> <a href="/signup">Sign up</a>"#.to_string(),
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - WebPics</title>
    <style>
        * {{
            box-sizing: border-box;
        }}
        body {{
            margin: 0;
            background: #fafafa;
            color: #222;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }}
        header {{
            display: flex;
            align-items: center;
            gap: 16px;
            padding: 12px 24px;
            background: #fff;
            border-bottom: 1px solid #e5e5e5;
        }}
        header .brand {{
            font-weight: 700;
            margin-right: auto;
            color: inherit;
            text-decoration: none;
        }}
        main {{
            max-width: 1100px;
            margin: 0 auto;
            padding: 24px;
        }}
        .inline {{
            display: inline;
        }}
        .tags a, .tag {{
            display: inline-block;
            padding: 2px 10px;
            margin: 2px;
            border-radius: 12px;
            background: #eee;
            color: #333;
            font-size: 13px;
            text-decoration: none;
        }}
        .tags a.active {{
            background: #4f46e5;
            color: #fff;
        }}
        .grid {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
            gap: 16px;
            margin: 16px 0;
        }}
        .card {{
            margin: 0;
            background: #fff;
            border: 1px solid #e5e5e5;
            border-radius: 8px;
            overflow: hidden;
        }}
        .card img {{
            width: 100%;
            aspect-ratio: 4 / 3;
            object-fit: cover;
            display: block;
        }}
        .card figcaption {{
            padding: 8px 12px;
            font-size: 13px;
        }}
        .card .meta {{
            color: #777;
        }}
        .card .download {{
            display: inline-block;
            margin-top: 6px;
            color: #4f46e5;
        }}
        .lightbox {{
            display: none;
            position: fixed;
            inset: 0;
            z-index: 10;
            background: rgba(0, 0, 0, 0.85);
            flex-direction: column;
            align-items: center;
            justify-content: center;
            gap: 12px;
        }}
        .lightbox:target {{
            display: flex;
        }}
        .lightbox .close {{
            position: absolute;
            inset: 0;
        }}
        .lightbox img {{
            position: relative;
            max-width: 92vw;
            max-height: 82vh;
        }}
        .lightbox .download {{
            position: relative;
            padding: 6px 16px;
            border-radius: 6px;
            background: #fff;
            color: #222;
            text-decoration: none;
        }}
        .pagination {{
            display: flex;
            gap: 12px;
            justify-content: center;
            align-items: center;
        }}
        .message {{
            padding: 10px 14px;
            border-radius: 6px;
            background: #fee2e2;
            color: #991b1b;
        }}
        form.stacked label {{
            display: block;
            margin: 12px 0 4px;
        }}
        table {{
            width: 100%;
            border-collapse: collapse;
            font-size: 13px;
        }}
        td, th {{
            padding: 6px 8px;
            border-bottom: 1px solid #eee;
            text-align: left;
            vertical-align: top;
        }}
        td.hash {{
            font-family: monospace;
            word-break: break-all;
        }}
    </style>
</head>
<body>
    <header>
        <a class="brand" href="/">WebPics</a>
        <a href="/upload">Upload</a>
        {account}
    </header>
    <main>
{body}
    </main>
</body>
</html>"##,
        title = html_escape(title),
        account = account,
        body = body,
    )
}

// =============================================================================
// Gallery
// =============================================================================

/// The gallery grid with tag filters and pagination.
///
/// The delete control is only rendered for administrators.
pub fn gallery_page(
    page: &GalleryPage,
    vocabulary: &TagVocabulary,
    user: Option<&CurrentUser>,
    offset: &FixedOffset,
) -> String {
    let is_admin = user.is_some_and(|u| u.is_admin);
    let current = gallery_href(&page.active_tags, page.page);

    let filters: String = vocabulary
        .tags()
        .iter()
        .map(|tag| {
            let class = if page.is_tag_active(tag) {
                r#" class="active""#
            } else {
                ""
            };
            format!(
                r#"<a href="{href}"{class}>{tag}</a>"#,
                href = html_escape(&gallery_href(&toggle_tag(&page.active_tags, tag), 1)),
                class = class,
                tag = html_escape(tag),
            )
        })
        .collect();

    let cards: String = if page.photos.is_empty() {
        r#"<p class="empty">No photos found.</p>"#.to_string()
    } else {
        let items: String = page
            .photos
            .iter()
            .map(|photo| {
                let delete = if is_admin {
                    delete_form(photo, &current)
                } else {
                    String::new()
                };
                format!(
                    r##"
        <figure class="card">
            <a href="#{anchor}" class="view"><img src="{src}" alt="{alt}" loading="lazy"></a>
            <figcaption>
                <div class="tags">{tags}</div>
                <div class="meta">{uploader} · {time}</div>
                <a href="{src}" class="download" download>Download</a>
                {delete}
            </figcaption>
        </figure>{lightbox}"##,
                    anchor = lightbox_anchor(photo),
                    src = html_escape(&photo.filepath),
                    alt = html_escape(&photo.tags.join(", ")),
                    tags = tag_chips(&photo.tags),
                    uploader = html_escape(&photo.uploader_nickname),
                    time = display_time(&photo.upload_time, offset),
                    delete = delete,
                    lightbox = lightbox(photo),
                )
            })
            .collect();
        format!(r#"<div class="grid">{}</div>"#, items)
    };

    let previous = if page.has_previous() {
        format!(
            r#"<a href="{}" rel="prev">Previous</a>"#,
            html_escape(&gallery_href(&page.active_tags, page.page - 1))
        )
    } else {
        String::new()
    };
    let next = if page.has_next() {
        format!(
            r#"<a href="{}" rel="next">Next</a>"#,
            html_escape(&gallery_href(&page.active_tags, page.page + 1))
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"<nav class="tags">{filters}</nav>
{cards}
<nav class="pagination">
    {previous}
    <span class="page-status">Page {page} of {total}</span>
    {next}
</nav>"#,
        filters = filters,
        cards = cards,
        previous = previous,
        page = page.page,
        total = page.total_pages,
        next = next,
    );

    layout("Gallery", user, &body)
}

// =============================================================================
// Upload
// =============================================================================

/// The upload form.
///
/// A script computes the SHA-256 of every chosen file in the browser and adds
/// one hidden `hash` input per file, in file order.
pub fn upload_page(
    vocabulary: &TagVocabulary,
    user: Option<&CurrentUser>,
    selected: &[String],
    message: Option<&str>,
) -> String {
    let tags: String = vocabulary
        .tags()
        .iter()
        .map(|tag| {
            let checked = if selected.iter().any(|s| s == tag) {
                " checked"
            } else {
                ""
            };
            format!(
                r#"<label class="tag"><input type="checkbox" name="tags" value="{tag}"{checked}> {tag}</label>"#,
                tag = html_escape(tag),
                checked = checked,
            )
        })
        .collect();

    let uploader = if user.is_some() {
        String::new()
    } else {
        r#"<label for="uploader_name">Your name</label>
    <input type="text" id="uploader_name" name="uploader_name" placeholder="anonymous">"#
            .to_string()
    };

    let body = format!(
        r#"<h1>Upload photos</h1>
{message}
<form method="post" action="/upload" enctype="multipart/form-data" class="stacked">
    <label for="photo">Photos</label>
    <input type="file" id="photo" name="photo" accept="image/*" multiple required>
    <div id="hashes"></div>
    <label>Tags</label>
    <div class="tags">{tags}</div>
    {uploader}
    <p><button type="submit" id="submit">Upload</button></p>
</form>
<script>
    document.getElementById('photo').addEventListener('change', async (event) => {{
        const box = document.getElementById('hashes');
        const submit = document.getElementById('submit');
        submit.disabled = true;
        box.replaceChildren();
        for (const file of event.target.files) {{
            const digest = await crypto.subtle.digest('SHA-256', await file.arrayBuffer());
            const hex = Array.from(new Uint8Array(digest))
                .map((b) => b.toString(16).padStart(2, '0'))
                .join('');
            const input = document.createElement('input');
            input.type = 'hidden';
            input.name = 'hash';
            input.value = hex;
            box.appendChild(input);
        }}
        submit.disabled = false;
    }});
</script>"#,
        message = message_banner(message),
        tags = tags,
        uploader = uploader,
    );

    layout("Upload", user, &body)
}

// =============================================================================
// Accounts
// =============================================================================

pub fn login_page(email: &str, message: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Sign in</h1>
{message}
<form method="post" action="/login" class="stacked">
    <label for="email">Email</label>
    <input type="email" id="email" name="email" value="{email}" required>
    <label for="password">Password</label>
    <input type="password" id="password" name="password" required>
    <p><button type="submit">Sign in</button></p>
</form>
<p>No account yet? <a href="/signup">Sign up</a></p>"#,
        message = message_banner(message),
        email = html_escape(email),
    );
    layout("Sign in", None, &body)
}

pub fn signup_page(email: &str, nickname: &str, message: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Sign up</h1>
{message}
<form method="post" action="/signup" class="stacked">
    <label for="email">Email</label>
    <input type="email" id="email" name="email" value="{email}" required>
    <label for="password">Password</label>
    <input type="password" id="password" name="password" required>
    <label for="nickname">Nickname</label>
    <input type="text" id="nickname" name="nickname" value="{nickname}" required>
    <p><button type="submit">Create account</button></p>
</form>"#,
        message = message_banner(message),
        email = html_escape(email),
        nickname = html_escape(nickname),
    );
    layout("Sign up", None, &body)
}

/// Profile page with the nickname form and the user's own uploads.
pub fn my_page(
    user: &CurrentUser,
    photos: &[PhotoRecord],
    offset: &FixedOffset,
    message: Option<&str>,
) -> String {
    let rows: String = photos
        .iter()
        .map(|photo| {
            format!(
                r#"
        <figure class="card">
            <img src="{src}" alt="" loading="lazy">
            <figcaption>
                <div class="tags">{tags}</div>
                <div class="meta">{time}</div>
            </figcaption>
        </figure>"#,
                src = html_escape(&photo.filepath),
                tags = tag_chips(&photo.tags),
                time = display_time(&photo.upload_time, offset),
            )
        })
        .collect();

    let uploads = if photos.is_empty() {
        r#"<p class="empty">You have not uploaded any photos yet.</p>"#.to_string()
    } else {
        format!(r#"<div class="grid">{}</div>"#, rows)
    };

    let nickname = user
        .profile
        .as_ref()
        .map(|p| p.nickname.as_str())
        .unwrap_or_default();

    let body = format!(
        r#"<h1>My page</h1>
{message}
<form method="post" action="/mypage" class="stacked">
    <label for="nickname">Nickname</label>
    <input type="text" id="nickname" name="nickname" value="{nickname}" required>
    <p><button type="submit">Save</button></p>
</form>
<h2>My uploads ({count})</h2>
{uploads}"#,
        message = message_banner(message),
        nickname = html_escape(nickname),
        count = photos.len(),
        uploads = uploads,
    );

    layout("My page", Some(user), &body)
}

// =============================================================================
// Administration
// =============================================================================

/// Every record with its metadata and a delete control.
pub fn admin_page(user: &CurrentUser, photos: &[PhotoRecord], offset: &FixedOffset) -> String {
    let rows: String = photos
        .iter()
        .map(|photo| {
            format!(
                r#"
        <tr>
            <td><a href="{src}"><img src="{src}" alt="" width="96" loading="lazy"></a></td>
            <td>{uploader}<br><span class="meta">{uid}</span></td>
            <td class="hash">{hash}</td>
            <td>{tags}</td>
            <td>{time}</td>
            <td>{delete}</td>
        </tr>"#,
                src = html_escape(&photo.filepath),
                uploader = html_escape(&photo.uploader_nickname),
                uid = html_escape(&photo.upload_by),
                hash = html_escape(&photo.file_hash),
                tags = tag_chips(&photo.tags),
                time = display_time(&photo.upload_time, offset),
                delete = delete_form(photo, "/admin"),
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Administration</h1>
<p>{count} photo(s)</p>
<table>
    <thead>
        <tr><th>Photo</th><th>Uploader</th><th>Hash</th><th>Tags</th><th>Uploaded</th><th></th></tr>
    </thead>
    <tbody>{rows}
    </tbody>
</table>"#,
        count = photos.len(),
        rows = rows,
    );

    layout("Administration", Some(user), &body)
}

// =============================================================================
// Errors
// =============================================================================

/// A generic error page.
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<h1>{code} {title}</h1>
<p>{message}</p>
<p><a href="/">Back to the gallery</a></p>"#,
        code = status.as_u16(),
        title = html_escape(title),
        message = html_escape(message),
    );
    layout(title, None, &body)
}

pub fn not_found_page() -> String {
    error_page(
        StatusCode::NOT_FOUND,
        "The page you are looking for does not exist.",
    )
}
