use super::utils::builtin_registry;
use crate::params::ParamValue;
use crate::plugin::api::{
    rebuild_shared_registry, shared_registry, Capability, DiscoveryConfig, PluginDescriptor, PluginError, PluginFactory, Registry,
    CLASS_VAR_NAME, CLASS_VAR_REQUEST_METHOD, CLASS_VAR_RESOURCE_TYPE,
};
use crate::plugin::builtin::checks::{CONTAINS_STRINGS, HTTP_STATUS_NO_ERROR, XML_PARSE};
use crate::plugin::builtin::http::{HTTP_GET, HTTP_GET_QUERY, HTTP_POST};
use crate::plugin::builtin::owsgetcaps::{OWS_GET_CAPS, WFS_GET_CAPS, WMS_GET_CAPS};
use crate::plugin::builtin::wmsdrilldown::WMS_DRILLDOWN;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::Arc;

#[test]
fn test_builtin_packages_are_discovered() {
    let registry = builtin_registry();
    assert!(!registry.is_empty());
    for id in [HTTP_GET, WMS_GET_CAPS, WMS_DRILLDOWN, XML_PARSE] {
        assert_eq!(registry.canonical_id(id).unwrap(), id);
    }
}

#[test]
fn test_legacy_identifiers_resolve() {
    let registry = builtin_registry();
    assert_eq!(
        registry
            .canonical_id("GeoHealthCheck.plugins.check.checks.XmlParse")
            .unwrap(),
        XML_PARSE
    );
    assert_eq!(
        registry
            .canonical_id("GeoHealthCheck.plugins.owsgetcaps.WmsGetCaps")
            .unwrap(),
        WMS_GET_CAPS
    );
    assert_eq!(
        registry
            .canonical_id("GeoHealthCheck.plugins.probe.owsgetcaps.WfsGetCaps")
            .unwrap(),
        WFS_GET_CAPS
    );
}

#[test]
fn test_unknown_identifiers() {
    let registry = builtin_registry();
    for id in [
        "geoprobe.plugins.check.checks.DoesNotExist",
        "no.such.package.Probe",
        "NoPackage",
        "",
    ] {
        assert!(
            matches!(registry.resolve(id), Err(PluginError::PluginNotFound { .. })),
            "{} should not resolve",
            id
        );
    }
}

#[test]
fn test_capability_mismatch() {
    let registry = builtin_registry();
    let err = registry.create_check(HTTP_GET).err().unwrap();
    assert_eq!(
        err,
        PluginError::CapabilityMismatch {
            plugin_id: HTTP_GET.to_string(),
            expected: Capability::Check,
            actual: Capability::Probe,
        }
    );
}

#[test]
fn test_abstract_type_is_not_constructible() {
    let registry = builtin_registry();
    let err = registry.create_probe(OWS_GET_CAPS).err().unwrap();
    assert!(matches!(err, PluginError::PluginConstruction { .. }));
}

#[test]
fn test_fresh_instances() {
    let registry = builtin_registry();
    let first = registry.create_probe(HTTP_GET);
    let second = registry.create_probe("GeoHealthCheck.plugins.probe.http.HttpGet");
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[test]
fn test_list_plugins_with_filters() {
    let registry = builtin_registry();

    let wms = registry.list_plugins(Capability::Probe, &[(CLASS_VAR_RESOURCE_TYPE, "OGC:WMS")]);
    assert_eq!(wms, vec![WMS_GET_CAPS.to_string(), WMS_DRILLDOWN.to_string()]);

    let posts = registry.list_plugins(Capability::Probe, &[(CLASS_VAR_REQUEST_METHOD, "POST")]);
    assert_eq!(posts, vec![HTTP_POST.to_string()]);

    let probes = registry.list_plugins(Capability::Probe, &[]);
    assert!(!probes.contains(&OWS_GET_CAPS.to_string()));
    assert!(probes.contains(&HTTP_GET_QUERY.to_string()));

    let none = registry.list_plugins(Capability::Probe, &[(CLASS_VAR_RESOURCE_TYPE, "OGC:Nope")]);
    assert!(none.is_empty());

    let basic = registry.list_plugins(Capability::ResourceAuth, &[(CLASS_VAR_NAME, "Basic")]);
    assert_eq!(basic.len(), 1);
}

#[test]
fn test_class_vars_are_inherited() {
    let registry = builtin_registry();
    let vars = registry.class_vars(HTTP_GET_QUERY).unwrap();
    assert_eq!(vars[CLASS_VAR_RESOURCE_TYPE], "*:*");
    assert_eq!(vars[CLASS_VAR_REQUEST_METHOD], "GET");
    assert_eq!(vars["REQUEST_TEMPLATE"], "?{query}");
}

#[test]
fn test_effective_schema_merges_supertypes() {
    let registry = builtin_registry();

    let schema = registry.effective_schema(HTTP_GET_QUERY).unwrap();
    let names: Vec<&str> = schema.names().collect();
    for name in ["username", "password", "query"] {
        assert!(names.contains(&name), "missing {}", name);
    }
    assert!(schema.get("query").unwrap().required);

    let wms = registry.effective_schema(WMS_GET_CAPS).unwrap();
    assert_eq!(wms.get("service").unwrap().value, Some(ParamValue::from("WMS")));
    let version = wms.get("version").unwrap();
    assert_eq!(version.default, Some(ParamValue::from("1.3.0")));
    assert!(version.required);
    assert_eq!(
        version.range,
        Some(vec![ParamValue::from("1.1.1"), ParamValue::from("1.3.0")])
    );
}

#[test]
fn test_check_usages_are_inherited() {
    let registry = builtin_registry();
    let usages = registry.check_usages(WMS_GET_CAPS).unwrap();
    let defaults: Vec<&str> = usages
        .iter()
        .filter(|u| u.default)
        .map(|u| u.check.as_str())
        .collect();
    assert_eq!(defaults.len(), 4);
    assert_eq!(defaults[0], HTTP_STATUS_NO_ERROR);

    let contains = usages.iter().find(|u| u.check == CONTAINS_STRINGS).unwrap();
    let strings = contains.set_params.get("strings").unwrap();
    assert_eq!(strings.value, Some(ParamValue::from(vec!["Title>"])));
}

#[test]
fn test_restricted_discovery() {
    let registry = Registry::discover(&DiscoveryConfig::with_sources(
        &["geoprobe.plugins.check"],
        &["not.installed"],
    ));
    assert!(registry.list_plugins(Capability::Probe, &[]).is_empty());
    assert!(!registry.list_plugins(Capability::Check, &[]).is_empty());
    assert!(registry.resolve(HTTP_GET).is_err());
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = Registry::new();
    let descriptor = || {
        PluginDescriptor::new("acme.plugins.Dummy", PluginFactory::Abstract(Capability::Check))
    };
    registry.register_plugin(descriptor()).unwrap();
    let err = registry.register_plugin(descriptor()).unwrap_err();
    assert!(matches!(err, PluginError::DuplicatePlugin { .. }));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_plugin_info() {
    let registry = builtin_registry();
    let info = registry
        .plugin_info("GeoHealthCheck.plugins.check.checks.XmlParse")
        .unwrap();
    assert_eq!(info.id, XML_PARSE);
    assert_eq!(info.capability, Capability::Check);
    assert_eq!(info.name, "Valid XML response");
}

#[test]
#[serial]
fn test_shared_registry_is_built_once() {
    let first = shared_registry();
    let second = shared_registry();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.resolve(HTTP_GET).is_ok());
}

#[test]
#[serial]
fn test_rebuild_replaces_shared_registry() {
    let before = shared_registry();
    let rebuilt = rebuild_shared_registry(&DiscoveryConfig::with_sources(&["geoprobe.plugins.check"], &[]));

    let after = shared_registry();
    assert!(Arc::ptr_eq(&rebuilt, &after));
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.resolve(HTTP_GET).is_err());
    // The old registry stays usable for whoever still holds it
    assert!(before.resolve(HTTP_GET).is_ok());

    rebuild_shared_registry(&DiscoveryConfig::default());
    assert!(shared_registry().resolve(HTTP_GET).is_ok());
}
