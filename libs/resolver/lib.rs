// Copyright 2018-2026 the Deno authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unused_async)]

/// Logs only when the options' `log_level` admits the record.
macro_rules! log_if {
  ($options:expr, $level:ident, $($arg:tt)+) => {
    if $options.log_level.allows(log::Level::$level) {
      log::log!(log::Level::$level, $($arg)+);
    }
  };
}

mod config;
mod filter;
mod memory_loader;
mod options;
mod registry;
mod resolver;
mod upgrade;

pub use config::ConfigError;
pub use config::PatternList;
pub use config::RC_FILE_NAME;
pub use config::UpgradeRc;
pub use filter::Filter;
pub use filter::FilterSet;
pub use filter::InvalidFilterError;
pub use memory_loader::MemoryPackageInfoLoader;
pub use ncu_version_spec::DependencyMap;
pub use options::DEFAULT_CONCURRENCY;
pub use options::LogLevel;
pub use options::Options;
pub use options::UpgradeCandidate;
pub use options::UpgradeFilter;
pub use registry::NOT_FOUND_ERROR;
pub use registry::PackageInfo;
pub use registry::PackageInfoLoader;
pub use registry::PackageInfoRegistry;
pub use registry::PackageVersionInfo;
pub use registry::PeerDependencyMap;
pub use registry::RegistryQueryError;
pub use registry::RegistryVersionQuerier;
pub use registry::VersionResult;
pub use registry::VersionResults;
pub use resolver::ResolveError;
pub use resolver::UpgradeResult;
pub use resolver::upgrade_package_definitions;
pub use upgrade::upgrade_dependencies;
