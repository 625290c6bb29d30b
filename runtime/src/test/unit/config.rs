use std::collections::HashMap;
use std::path::PathBuf;

use kiln_device::KernelCache;
use test_case::test_case;

use crate::config::{CACHE_DIR_NAME, CacheLocation, RuntimeConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| vars.get(key).cloned()
}

#[test_case(&[], CacheLocation::Disabled ; "nothing set")]
#[test_case(&[("KILN_DISABLE_CACHE", "1"), ("KILN_CACHE_DIR", "/tmp/k")], CacheLocation::Disabled ; "disable wins")]
#[test_case(&[("KILN_CACHE_DIR", ":memory:")], CacheLocation::Memory ; "memory")]
#[test_case(&[("KILN_CACHE_DIR", "/var/k"), ("HOME", "/home/u")], CacheLocation::Directory("/var/k".into()) ; "explicit dir")]
#[test_case(&[("KILN_CACHE_DIR", ""), ("HOME", "/home/u")], CacheLocation::Directory(PathBuf::from("/home/u").join(CACHE_DIR_NAME)) ; "empty dir falls back")]
#[test_case(&[("LOCALAPPDATA", "C:/app"), ("HOME", "/home/u")], CacheLocation::Directory(PathBuf::from("C:/app").join(CACHE_DIR_NAME)) ; "localappdata first")]
#[test_case(&[("HOME", ""), ("USERPROFILE", "C:/u")], CacheLocation::Directory(PathBuf::from("C:/u").join(CACHE_DIR_NAME)) ; "empty base skipped")]
fn resolves_cache_location(vars: &[(&str, &str)], expected: CacheLocation) {
    assert_eq!(RuntimeConfig::from_lookup(lookup(vars)).cache, expected);
}

#[test]
fn builder_defaults_to_disabled() {
    assert_eq!(RuntimeConfig::builder().build(), RuntimeConfig::default());
    assert_eq!(RuntimeConfig::builder().cache(CacheLocation::Memory).build().cache, CacheLocation::Memory);
}

#[test]
fn disabled_cache_never_hits() {
    let cache = RuntimeConfig::default().open_cache();
    cache.put("kernel", "dev", "src", b"bin");
    assert_eq!(cache.get("kernel", "dev", "src"), None);
}

#[test]
fn memory_caches_are_private() {
    let config = RuntimeConfig::builder().cache(CacheLocation::Memory).build();
    let first = config.open_cache();
    first.put("kernel", "dev", "src", b"bin");
    assert_eq!(first.get("kernel", "dev", "src").as_deref(), Some(&b"bin"[..]));
    assert_eq!(config.open_cache().get("kernel", "dev", "src"), None);
}

#[test]
fn directory_cache_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig::builder().cache(CacheLocation::Directory(dir.path().join("nested"))).build();

    config.open_cache().put("kernel", "dev", "src", b"bin");
    assert_eq!(config.open_cache().get("kernel", "dev", "src").as_deref(), Some(&b"bin"[..]));
}

#[test]
fn unusable_directory_disables_caching() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = RuntimeConfig::builder().cache(CacheLocation::Directory(file.path().join("cache"))).build();

    let cache = config.open_cache();
    cache.put("kernel", "dev", "src", b"bin");
    assert_eq!(cache.get("kernel", "dev", "src"), None);
}
