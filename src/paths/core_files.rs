//! Top-level entries of a WordPress core install.
//!
//! When the core moves but the home folder does not, these are mapped one by
//! one instead of moving the whole home folder.

/// Core directories in the WordPress root.
pub const WP_CORE_DIRS: &[&str] = &["wp-admin", "wp-includes"];

/// Core files in the WordPress root.
pub const WP_CORE_FILES: &[&str] = &[
    "index.php",
    "license.txt",
    "readme.html",
    "wp-activate.php",
    "wp-blog-header.php",
    "wp-comments-post.php",
    "wp-config-sample.php",
    "wp-cron.php",
    "wp-links-opml.php",
    "wp-load.php",
    "wp-login.php",
    "wp-mail.php",
    "wp-settings.php",
    "wp-signup.php",
    "wp-trackback.php",
    "xmlrpc.php",
];

/// Core entries that move with the core folder. `index.php` is excluded: it
/// stays in the home folder and loads the relocated core.
pub fn relocatable_core_entries() -> impl Iterator<Item = &'static str> {
    WP_CORE_DIRS
        .iter()
        .chain(WP_CORE_FILES)
        .copied()
        .filter(|name| *name != "index.php")
}
