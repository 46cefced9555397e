//! Client bundle installed into the generated site.

use std::fs;
use std::path::{Path, PathBuf};

use crate::PluginError;

/// Directory under the site root holding the bundle.
pub const BUNDLE_DIR: &str = "docframe";

/// File name of the bundle.
pub const BUNDLE_NAME: &str = "docframe.js";

/// Base URL assignment shipped in the bundle.
pub const ORIGINAL_BASE_URL: &str = "const BASE_URL = document.location.origin;";

/// Path of the bundle relative to the site root, as listed in page scripts.
pub fn bundle_script_path() -> String {
    format!("{}/{}", BUNDLE_DIR, BUNDLE_NAME)
}

/// Base URL assignment pointing frames at `base_url`.
pub fn base_url_assignment(base_url: &str) -> String {
    format!("const BASE_URL = '{}';", base_url)
}

/// Bundle text, with the base URL rewritten when a dev server is given.
pub fn bundle_source(dev_base_url: Option<&str>) -> String {
    match dev_base_url {
        Some(url) => CLIENT_BUNDLE.replace(ORIGINAL_BASE_URL, &base_url_assignment(url)),
        None => CLIENT_BUNDLE.to_string(),
    }
}

/// Write the bundle to `<site_dir>/docframe/docframe.js`.
///
/// Always starts from the pristine bundle, so installing twice with the
/// same arguments leaves the same file.
pub fn install_bundle(site_dir: &Path, dev_base_url: Option<&str>) -> Result<PathBuf, PluginError> {
    let dir = site_dir.join(BUNDLE_DIR);
    fs::create_dir_all(&dir).map_err(|e| PluginError::Write {
        path: dir.clone(),
        message: e.to_string(),
    })?;

    let path = dir.join(BUNDLE_NAME);
    fs::write(&path, bundle_source(dev_base_url)).map_err(|e| PluginError::Write {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(path)
}

const CLIENT_BUNDLE: &str = r#"// docframe - live component frames
(function() {
  'use strict';

  // DO NOT EDIT: this is substituted when running the dev server
  const BASE_URL = document.location.origin;

  class DocframeFrame extends HTMLElement {
    connectedCallback() {
      if (!this.hasAttribute('file')) {
        throw new Error('docframe-frame must have a file attribute');
      }
      if (this.querySelector('iframe')) return;

      const file = encodeURIComponent(this.getAttribute('file'));
      const iframe = document.createElement('iframe');
      iframe.src = BASE_URL + document.location.pathname + '?file=' + file;
      iframe.title = this.getAttribute('title') || this.getAttribute('file');
      iframe.loading = 'lazy';
      iframe.style.width = '100%';
      iframe.style.border = '0';
      iframe.style.minHeight = this.getAttribute('height') || '12rem';
      this.appendChild(iframe);
    }
  }

  if (!customElements.get('docframe-frame')) {
    customElements.define('docframe-frame', DocframeFrame);
  }
})();
"#;
