//! Test utilities for building fixture projects

use std::fs;
use tempfile::TempDir;

/// Create a temporary project with the given `(path, content)` files.
/// A path ending in `/` creates an empty directory.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if path.ends_with('/') {
            fs::create_dir_all(&full_path).unwrap();
            continue;
        }
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// A small Express-style app with routes, views and static assets.
pub fn create_express_app() -> TempDir {
    create_repo_with_structure(&[
        (
            "app/server.js",
            r#"// Demo entrypoint
const path = require('path');
const express = require('express');
const apps = require('./routes/apps');

const app = express();
app.use(express.static(path.join(__dirname, '..', 'public')));
app.set('views', path.join(__dirname, 'views'));
app.use('/apps', apps);

const PORT = process.env.PORT || 4000;
app.listen(PORT);
"#,
        ),
        (
            "app/routes/apps.js",
            r#"/**
 * App routes
 */
const router = require('express').Router();
const db = require('../lib/db');

router.get('/', (req, res) => {
  if (!req.query.q) {
    return res.render('index');
  }
  res.json(db.find(req.query.q));
});

module.exports = router;
"#,
        ),
        ("app/lib/db.js", "exports.find = (q) => [q];\n"),
        ("app/views/index.ejs", "<link rel=\"stylesheet\" href=\"/css/site.css\">\n<h1>Apps</h1>\n"),
        ("public/css/site.css", "body { background: url(../img/bg.png); }\n"),
        ("public/img/bg.png", "png"),
        ("public/index.html", "<script src=\"/js/main.js\"></script>\n"),
        ("public/js/main.js", "// Browser bundle\nconsole.log('hi');\n"),
        ("node_modules/express/index.js", "module.exports = {};\n"),
    ])
}
