use chrono::{DateTime, Utc};
use serde::Deserialize;

const DEFAULT_HEADING: &str = "No Heading";
const DEFAULT_SUB_HEADING: &str = "No Subheading";
const DEFAULT_AUTHOR: &str = "guest";
const DEFAULT_AUTHOR_LINK: &str = "#";
const DEFAULT_TIMESTAMP: i64 = 1_469_227_894;
const DEFAULT_CONTENT: &str = "~_~";

fn default_heading() -> String {
    DEFAULT_HEADING.to_string()
}
fn default_sub_heading() -> String {
    DEFAULT_SUB_HEADING.to_string()
}
fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}
fn default_author_link() -> String {
    DEFAULT_AUTHOR_LINK.to_string()
}
fn default_timestamp() -> i64 {
    DEFAULT_TIMESTAMP
}
fn default_content() -> String {
    DEFAULT_CONTENT.to_string()
}

/// On-disk shape of `<blog-dir>/<id>`. Every field is optional; missing ones
/// fall back to the defaults above rather than failing the decode.
#[derive(Debug, Deserialize)]
pub struct BlogRecordRaw {
    #[serde(default = "default_heading")]
    pub heading: String,
    #[serde(default = "default_sub_heading")]
    pub sub_heading: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_author_link")]
    pub author_link: String,
    #[serde(default = "default_timestamp")]
    pub timestamp: i64,
    #[serde(default = "default_content")]
    pub content: String,
}

impl Default for BlogRecordRaw {
    fn default() -> Self {
        BlogRecordRaw {
            heading: default_heading(),
            sub_heading: default_sub_heading(),
            author: default_author(),
            author_link: default_author_link(),
            timestamp: default_timestamp(),
            content: default_content(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlogRecord {
    pub id: u64,
    pub heading: String,
    pub sub_heading: String,
    pub author: String,
    pub author_link: String,
    pub timestamp: i64,
    pub content: String,
}

impl BlogRecord {
    pub fn from_raw(id: u64, raw: BlogRecordRaw) -> Self {
        BlogRecord {
            id,
            heading: raw.heading,
            sub_heading: raw.sub_heading,
            author: raw.author,
            author_link: raw.author_link,
            timestamp: raw.timestamp,
            content: raw.content,
        }
    }

    pub fn decode(id: u64, json: &str) -> serde_json::Result<Self> {
        let raw: BlogRecordRaw = serde_json::from_str(json)?;
        Ok(Self::from_raw(id, raw))
    }

    pub fn timestamp_display(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
            .map(|dt| dt.format("%a, %d %b %Y %T GMT").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }

    /// Renders the per-post page body, substituted into `tmpl_blog`.
    pub fn render_page(&self) -> String {
        render_blog_template(
            &self.heading,
            &self.sub_heading,
            &self.author_link,
            &self.author,
            &self.timestamp_display(),
            &self.content,
        )
    }

    /// Renders one row of the combined index page, substituted into
    /// `tmpl_blog_info`.
    pub fn render_index_row(&self) -> String {
        render_blog_info_template(
            self.id,
            &self.heading,
            &self.sub_heading,
            &self.author_link,
            &self.author,
            &self.timestamp_display(),
        )
    }
}

/// Positional template for a single blog post page: heading, sub-heading,
/// author link, author, display timestamp, content.
pub fn render_blog_template(
    heading: &str,
    sub_heading: &str,
    author_link: &str,
    author: &str,
    timestamp: &str,
    content: &str,
) -> String {
    format!(
        "<article>\n\
         <h1>{heading}</h1>\n\
         <h2>{sub_heading}</h2>\n\
         <p class=\"byline\">by <a href=\"{author_link}\">{author}</a> on {timestamp}</p>\n\
         <div class=\"content\">{content}</div>\n\
         </article>\n",
        heading = heading,
        sub_heading = sub_heading,
        author_link = author_link,
        author = author,
        timestamp = timestamp,
        content = content,
    )
}

/// Positional template for one row of the blog index: id, heading,
/// sub-heading, author link, author, display timestamp.
pub fn render_blog_info_template(
    id: u64,
    heading: &str,
    sub_heading: &str,
    author_link: &str,
    author: &str,
    timestamp: &str,
) -> String {
    format!(
        "<li class=\"blog-row\">\n\
         <a href=\"/blogs/{id}\"><h3>{heading}</h3></a>\n\
         <p>{sub_heading}</p>\n\
         <p class=\"byline\">by <a href=\"{author_link}\">{author}</a> on {timestamp}</p>\n\
         </li>\n",
        id = id,
        heading = heading,
        sub_heading = sub_heading,
        author_link = author_link,
        author = author,
        timestamp = timestamp,
    )
}
