use crate::error::SnapError;

/// An enumerated video input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
}

impl DeviceInfo {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Pick a device by exact name, then case-insensitive substring, else the
/// first device when no hint is given.
pub fn select_device<'a>(
    devices: &'a [DeviceInfo],
    hint: Option<&str>,
) -> Result<&'a DeviceInfo, SnapError> {
    let not_found = || SnapError::NoDeviceFound(hint.map(str::to_string));

    let Some(name) = hint else {
        return devices.first().ok_or_else(not_found);
    };

    if let Some(exact) = devices.iter().find(|d| d.name == name) {
        return Ok(exact);
    }

    let needle = name.to_lowercase();
    devices
        .iter()
        .find(|d| d.name.to_lowercase().contains(&needle))
        .ok_or_else(not_found)
}
