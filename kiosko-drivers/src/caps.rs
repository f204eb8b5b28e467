//! Rendering of capability descriptors into WebDriver capability maps.

use kiosko_common::CapabilityDescriptor;
use serde_json::{json, Value};
use webdriver::capabilities::Capabilities;

/// Provider credentials injected into the vendor capability block.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub access_key: String,
}

/// Render `desc` into the W3C capability map the provider hub expects.
///
/// Provider-specific flags (and credentials, when present) travel in the
/// `bstack:options` vendor block; the closed [`kiosko_common::ProviderFlags`]
/// set is the only thing that ever lands there.
pub fn to_webdriver_caps(
    desc: &CapabilityDescriptor,
    credentials: Option<&Credentials>,
) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), json!(desc.browser));
    caps.insert("browserVersion".to_string(), json!(desc.browser_version));

    let mut bstack = serde_json::Map::new();
    bstack.insert("os".to_string(), json!(desc.os));
    bstack.insert("osVersion".to_string(), json!(desc.os_version));
    bstack.insert("projectName".to_string(), json!(desc.flags.project));
    bstack.insert("buildName".to_string(), json!(desc.flags.build));
    bstack.insert("sessionName".to_string(), json!(desc.flags.session_name));
    bstack.insert("debug".to_string(), json!(desc.flags.debug));
    bstack.insert("consoleLogs".to_string(), json!(desc.flags.console_logs));
    bstack.insert("networkLogs".to_string(), json!(desc.flags.network_logs));

    if let Some(device) = &desc.flags.device {
        bstack.insert("deviceName".to_string(), json!(device));
    }
    if let Some(real_mobile) = desc.flags.real_mobile {
        bstack.insert("realMobile".to_string(), json!(real_mobile));
    }
    if let Some(resolution) = &desc.flags.resolution {
        bstack.insert("resolution".to_string(), json!(resolution));
    }
    if let Some(creds) = credentials {
        bstack.insert("userName".to_string(), json!(creds.username));
        bstack.insert("accessKey".to_string(), json!(creds.access_key));
    }

    caps.insert("bstack:options".to_string(), Value::Object(bstack));
    caps
}

/// Capabilities for a local chromedriver session, used when no provider is
/// configured.
pub fn local_chrome_caps(headless: bool) -> Capabilities {
    let mut args = vec![
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--window-size=1920,1080",
    ];
    if headless {
        args.push("--headless");
    }

    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosko_common::ProviderFlags;

    fn desktop_descriptor() -> CapabilityDescriptor {
        CapabilityDescriptor {
            browser: "Firefox".into(),
            browser_version: "latest".into(),
            os: "Windows".into(),
            os_version: "10".into(),
            flags: ProviderFlags {
                resolution: Some("1920x1080".into()),
                ..ProviderFlags::default()
            },
        }
    }

    #[test]
    fn desktop_caps_carry_vendor_block_without_device() {
        let caps = to_webdriver_caps(&desktop_descriptor(), None);
        assert_eq!(caps["browserName"], json!("Firefox"));
        let bstack = caps["bstack:options"].as_object().unwrap();
        assert_eq!(bstack["os"], json!("Windows"));
        assert_eq!(bstack["resolution"], json!("1920x1080"));
        assert!(!bstack.contains_key("deviceName"));
        assert!(!bstack.contains_key("userName"));
    }

    #[test]
    fn credentials_land_in_vendor_block_only() {
        let creds = Credentials {
            username: "user".into(),
            access_key: "key".into(),
        };
        let caps = to_webdriver_caps(&desktop_descriptor(), Some(&creds));
        let bstack = caps["bstack:options"].as_object().unwrap();
        assert_eq!(bstack["userName"], json!("user"));
        assert_eq!(bstack["accessKey"], json!("key"));
        assert!(!caps.contains_key("userName"));
    }

    #[test]
    fn mobile_flags_are_forwarded() {
        let mut desc = desktop_descriptor();
        desc.flags.device = Some("Samsung Galaxy S21".into());
        desc.flags.real_mobile = Some(true);
        let caps = to_webdriver_caps(&desc, None);
        let bstack = caps["bstack:options"].as_object().unwrap();
        assert_eq!(bstack["deviceName"], json!("Samsung Galaxy S21"));
        assert_eq!(bstack["realMobile"], json!(true));
    }

    #[test]
    fn local_caps_toggle_headless() {
        let caps = local_chrome_caps(true);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.contains(&json!("--headless")));
        let caps = local_chrome_caps(false);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.contains(&json!("--headless")));
    }
}
