//! Settings-derived processes and their HTTP export.
//!
//! `export` binds the four application processes into the registry and
//! republishes three of them as HTTP routes. Export runs once after the
//! collaborators are ready; a second call is a conflict, never a silent
//! re-registration.

pub mod xgen;

use anyhow::Result;
use axum::http::Method;
use serde_json::Value;
use tracing::info;

use crate::{
    error::ShellError,
    i18n::{self, LocaleStore},
    icons::IconLibrary,
    login::LoginProvider,
    paths::Layout,
    process::ProcessRegistry,
    settings::SettingsStore,
    web::routes::{ArgBinding, RouteDescriptor, RouteTable},
};

/// Prefix all API routes of this shell live under.
pub const API_PREFIX: &str = "__portal";

/// Namespace the settings document translates under.
pub const APP_NAMESPACE: &str = "app";
/// Namespace menu entries translate under.
pub const MENU_NAMESPACE: &str = "menu";

pub const PROCESS_SETTING: &str = "portal.app.setting";
pub const PROCESS_XGEN: &str = "portal.app.xgen";
pub const PROCESS_MENU: &str = "portal.app.menu";
pub const PROCESS_ICONS: &str = "portal.app.icons";

/// The collaborators every application process reads from.
#[derive(Clone)]
pub struct AppContext {
    pub store: SettingsStore,
    pub locales: LocaleStore,
    pub logins: LoginProvider,
    pub icons: IconLibrary,
    pub registry: ProcessRegistry,
    pub routes: RouteTable,
}

impl AppContext {
    /// Load every collaborator from the workspace.
    pub fn bootstrap(layout: &Layout) -> Result<Self> {
        let store = SettingsStore::new();
        store.load(layout)?;
        let locales = LocaleStore::new();
        locales.load(layout)?;
        let logins = LoginProvider::load(layout)?;
        let icons = IconLibrary::new(layout.clone());

        Ok(Self {
            store,
            locales,
            logins,
            icons,
            registry: ProcessRegistry::new(),
            routes: RouteTable::new(),
        })
    }
}

/// Register the application processes and derive their HTTP routes.
pub fn export(ctx: &AppContext) -> Result<()> {
    register_setting(ctx)?;
    register_xgen(ctx)?;
    register_menu(ctx)?;
    register_icons(ctx)?;

    for (segment, process, binding, translate_response) in [
        ("setting", PROCESS_SETTING, ArgBinding::None, true),
        ("xgen", PROCESS_XGEN, ArgBinding::Locale, false),
        ("menu", PROCESS_MENU, ArgBinding::Locale, false),
    ] {
        ctx.routes.register(RouteDescriptor {
            method: Method::GET,
            path: format!("/api/{API_PREFIX}/app/{segment}"),
            process: process.to_string(),
            binding,
            translate_response,
        })?;
    }

    info!(processes = 4, routes = ctx.routes.len(), "application export complete");
    Ok(())
}

/// Returns the untranslated settings document.
///
/// Translation is the HTTP layer's responsibility, driven by the request
/// locale, so one registry entry serves every locale.
fn register_setting(ctx: &AppContext) -> Result<()> {
    let store = ctx.store.clone();
    ctx.registry.register(PROCESS_SETTING, move |_args| {
        let settings = store.current()?;
        Ok(serde_json::to_value(settings.as_ref())?)
    })
}

fn register_xgen(ctx: &AppContext) -> Result<()> {
    let store = ctx.store.clone();
    let locales = ctx.locales.clone();
    let logins = ctx.logins.clone();
    ctx.registry.register(PROCESS_XGEN, move |args| {
        let locale = locale_arg(args);
        xgen::compose(&store, &locales, &logins, &locale)
    })
}

/// Thin forwarder to the menu process named by the settings document, plus
/// locale translation of whatever it yields.
fn register_menu(ctx: &AppContext) -> Result<()> {
    let store = ctx.store.clone();
    let locales = ctx.locales.clone();
    let registry = ctx.registry.clone();
    ctx.registry.register(PROCESS_MENU, move |args| {
        let locale = locale_arg(args);
        let settings = store.current()?;
        let menu_args: Vec<Value> =
            settings.menu.args.iter().cloned().map(Value::String).collect();
        let entries = registry.invoke(&settings.menu.process, &menu_args)?;
        Ok(i18n::translate_value(&locales, &locale, MENU_NAMESPACE, &entries))
    })
}

fn register_icons(ctx: &AppContext) -> Result<()> {
    let icons = ctx.icons.clone();
    ctx.registry.register(PROCESS_ICONS, move |args| {
        let name = args
            .first()
            .and_then(Value::as_str)
            .ok_or(ShellError::IconNotFound { name: String::new() })?;
        Ok(Value::String(icons.resolve(name)?))
    })
}

/// arg[0] as a normalized locale tag, else the process default.
fn locale_arg(args: &[Value]) -> String {
    args.first()
        .and_then(Value::as_str)
        .and_then(i18n::normalize_locale_tag)
        .unwrap_or_else(i18n::default_locale)
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    use super::*;

    fn scaffold() -> (TempDir, Layout) {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path().to_path_buf());
        layout.ensure().unwrap();

        fs::write(
            layout.config_dir().join("app.toml"),
            r#"
name = "::Demo Application"
short = "::Demo"
description = "::Another portal application"

[menu]
process = "flows.app.menu"
args = ["demo"]

[optional]
hideNotification = true
"#,
        )
        .unwrap();
        fs::write(
            layout.locale_table_path("zh-cn"),
            r#"
[app]
"Demo Application" = "示例应用"
"Demo" = "演示"
"Another portal application" = "又一个门户应用"

[menu]
"Pets" = "宠物"
"#,
        )
        .unwrap();
        fs::write(
            layout.login_config_path("admin"),
            "entry = \"/x/Chart/dashboard\"\n",
        )
        .unwrap();
        fs::write(layout.login_config_path("user"), "entry = \"/x/Table/pet\"\n").unwrap();
        fs::write(layout.icon_path("app.png"), b"png-bytes-would-go-here").unwrap();
        fs::write(layout.icon_path("app.ico"), b"ico-bytes-would-go-here").unwrap();

        (dir, layout)
    }

    fn exported_context(layout: &Layout) -> AppContext {
        let ctx = AppContext::bootstrap(layout).unwrap();
        export(&ctx).unwrap();
        ctx
    }

    #[test]
    fn export_registers_processes_and_routes() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        for name in [PROCESS_SETTING, PROCESS_XGEN, PROCESS_MENU, PROCESS_ICONS] {
            assert!(ctx.registry.contains(name), "{name}");
        }
        assert_eq!(ctx.routes.len(), 3);

        let paths: Vec<String> = ctx.routes.descriptors().into_iter().map(|d| d.path).collect();
        assert_eq!(
            paths,
            vec![
                "/api/__portal/app/menu".to_string(),
                "/api/__portal/app/setting".to_string(),
                "/api/__portal/app/xgen".to_string(),
            ]
        );
    }

    #[test]
    fn second_export_is_a_conflict() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        let err = export(&ctx).unwrap_err();
        let shell = err.downcast_ref::<ShellError>().unwrap();
        assert!(matches!(shell, ShellError::ProcessAlreadyRegistered { .. }));
    }

    #[test]
    fn setting_process_returns_the_untranslated_document() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        let result = ctx.registry.invoke(PROCESS_SETTING, &[]).unwrap();
        assert_eq!(result["name"], "::Demo Application");
        assert_eq!(result["menu"]["process"], "flows.app.menu");
        assert_eq!(result["optional"]["hideNotification"], true);
    }

    #[test]
    fn xgen_process_composes_the_bootstrap_config() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        let xgen = ctx.registry.invoke(PROCESS_XGEN, &[json!("zh-cn")]).unwrap();
        assert_eq!(xgen.pointer("/apiPrefix").unwrap(), "__portal");
        assert_eq!(xgen.pointer("/name").unwrap(), "示例应用");
        assert_eq!(xgen.pointer("/description").unwrap(), "又一个门户应用");
        assert_eq!(xgen.pointer("/optional/hideNotification").unwrap(), true);
        assert_eq!(xgen.pointer("/optional/hideSetting").unwrap(), false);
        assert_eq!(xgen.pointer("/favicon").unwrap(), "/api/__portal/app/icons/app.ico");
        assert_eq!(xgen.pointer("/logo").unwrap(), "/api/__portal/app/icons/app.png");
        assert_eq!(xgen.pointer("/token").unwrap(), "localStorage");
        assert_eq!(
            xgen.pointer("/login/admin/captcha").unwrap(),
            "/api/__portal/login/admin/captcha?type=digit"
        );
        assert_eq!(xgen.pointer("/login/admin/login").unwrap(), "/api/__portal/login/admin");
        assert_eq!(xgen.pointer("/login/user/captcha").unwrap(),
            "/api/__portal/login/user/captcha?type=digit");
        assert_eq!(xgen.pointer("/login/user/login").unwrap(), "/api/__portal/login/user");
        assert_eq!(xgen.pointer("/login/entry/admin").unwrap(), "/x/Chart/dashboard");
        assert_eq!(xgen.pointer("/login/entry/user").unwrap(), "/x/Table/pet");
        assert_eq!(xgen.pointer("/login/layout/cover").unwrap(), "/assets/images/login/cover.svg");

        let expected_mode = env::var("PORTAL_ENV").unwrap_or_else(|_| "production".to_string());
        assert_eq!(xgen.pointer("/mode").unwrap(), &json!(expected_mode));
    }

    #[test]
    fn menu_process_forwards_and_translates() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        ctx.registry
            .register("flows.app.menu", |args| {
                assert_eq!(args, [json!("demo")]);
                Ok(json!([
                    { "name": "::Pets", "path": "/x/Table/pet" },
                    { "name": "Dashboard", "path": "/x/Chart/dashboard" }
                ]))
            })
            .unwrap();

        let menu = ctx.registry.invoke(PROCESS_MENU, &[json!("zh-cn")]).unwrap();
        let entries = menu.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "宠物");
        assert_eq!(entries[0]["path"], "/x/Table/pet");
        assert_eq!(entries[1]["name"], "Dashboard");
    }

    #[test]
    fn menu_process_fails_when_the_menu_source_is_unregistered() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        let err = ctx.registry.invoke(PROCESS_MENU, &[]).unwrap_err();
        let shell = err.downcast_ref::<ShellError>().unwrap();
        assert!(matches!(shell, ShellError::ProcessNotFound { .. }));
    }

    #[test]
    fn icons_process_returns_encoded_bytes() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        let result = ctx.registry.invoke(PROCESS_ICONS, &[json!("app.png")]).unwrap();
        assert!(result.as_str().unwrap().len() > 10);

        let err = ctx.registry.invoke(PROCESS_ICONS, &[json!("missing.png")]).unwrap_err();
        let shell = err.downcast_ref::<ShellError>().unwrap();
        assert!(matches!(shell, ShellError::IconNotFound { .. }));
    }

    #[test]
    fn translated_views_never_touch_the_store() {
        let (_dir, layout) = scaffold();
        let ctx = exported_context(&layout);

        let before = ctx.store.current().unwrap();
        let _ = ctx.registry.invoke(PROCESS_XGEN, &[json!("zh-cn")]).unwrap();
        let after = ctx.store.current().unwrap();
        assert_eq!(before.as_ref(), after.as_ref());
        assert_eq!(after.name, "::Demo Application");
    }
}
