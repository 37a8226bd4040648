// Copyright 2018-2026 the Deno authors. MIT license.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use deno_error::JsErrorBox;
use parking_lot::Mutex;

use crate::PackageInfo;
use crate::PackageInfoLoader;
use crate::PackageVersionInfo;

/// Serves package documents held in memory.
#[derive(Debug, Default)]
pub struct MemoryPackageInfoLoader {
  package_infos: Mutex<HashMap<String, PackageInfo>>,
  failures: Mutex<HashMap<String, String>>,
}

impl MemoryPackageInfoLoader {
  pub fn add_package_info(&self, info: PackageInfo) {
    self.package_infos.lock().insert(info.name.clone(), info);
  }

  pub fn ensure_package(&self, name: &str) {
    self
      .package_infos
      .lock()
      .entry(name.to_string())
      .or_insert_with(|| PackageInfo {
        name: name.to_string(),
        ..Default::default()
      });
  }

  pub fn ensure_package_version(&self, name: &str, version: &str) {
    self.with_version_info((name, version), |_| {});
  }

  pub fn add_peer_dependency(
    &self,
    package: (&str, &str),
    peer: (&str, &str),
  ) {
    self.with_version_info(package, |version_info| {
      version_info
        .peer_dependencies
        .insert(peer.0.to_string(), peer.1.to_string());
    });
  }

  pub fn deprecate(&self, name: &str, version: &str, message: &str) {
    self.with_version_info((name, version), |version_info| {
      version_info.deprecated = Some(message.to_string());
    });
  }

  pub fn set_dist_tag(&self, name: &str, tag: &str, version: &str) {
    self.ensure_package(name);
    let mut package_infos = self.package_infos.lock();
    if let Some(info) = package_infos.get_mut(name) {
      info.dist_tags.insert(tag.to_string(), version.to_string());
    }
  }

  /// Makes every load of `name` fail with `message`.
  pub fn fail_loading(&self, name: &str, message: &str) {
    self
      .failures
      .lock()
      .insert(name.to_string(), message.to_string());
  }

  fn with_version_info(
    &self,
    (name, version): (&str, &str),
    update: impl FnOnce(&mut PackageVersionInfo),
  ) {
    self.ensure_package(name);
    let mut package_infos = self.package_infos.lock();
    if let Some(info) = package_infos.get_mut(name) {
      let version_info = info
        .versions
        .entry(version.to_string())
        .or_insert_with(|| PackageVersionInfo {
          version: version.to_string(),
          ..Default::default()
        });
      update(version_info);
    }
  }
}

#[async_trait(?Send)]
impl PackageInfoLoader for MemoryPackageInfoLoader {
  async fn load_package_info(
    &self,
    name: &str,
  ) -> Result<Option<Arc<PackageInfo>>, JsErrorBox> {
    if let Some(message) = self.failures.lock().get(name) {
      return Err(JsErrorBox::generic(message.clone()));
    }
    Ok(self.package_infos.lock().get(name).cloned().map(Arc::new))
  }
}
