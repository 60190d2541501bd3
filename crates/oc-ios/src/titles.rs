//! Well-known title ids and their NAND locations

/// System Menu title id
pub const SYSTEM_MENU: u64 = 0x0000_0001_0000_0002;

/// uid the System Menu runs under
pub const SYSMENU_UID: u32 = 0x1000;

/// gid the System Menu runs under
pub const SYSMENU_GID: u16 = 1;

/// Title id of IOS `version`
pub const fn ios(version: u32) -> u64 {
    0x0000_0001_0000_0000 | version as u64
}

/// Whether `title_id` names an IOS (system title 00000001 with a low word in 3..=255)
pub fn is_ios(title_id: u64) -> bool {
    (title_id >> 32) == 1 && (3..=255).contains(&(title_id as u32))
}

/// Human readable form used in log messages
pub fn format_title_id(title_id: u64) -> String {
    format!("{:08x}/{:08x}", title_id >> 32, title_id as u32)
}

/// `/title/<hi>/<lo>`
pub fn title_root(title_id: u64) -> String {
    format!("/title/{:08x}/{:08x}", title_id >> 32, title_id as u32)
}

/// `/title/<hi>/<lo>/content`
pub fn title_content_dir(title_id: u64) -> String {
    format!("{}/content", title_root(title_id))
}

/// `/title/<hi>/<lo>/data`
pub fn title_data_dir(title_id: u64) -> String {
    format!("{}/data", title_root(title_id))
}

/// `/title/<hi>/<lo>/content/title.tmd`
pub fn tmd_path(title_id: u64) -> String {
    format!("{}/title.tmd", title_content_dir(title_id))
}

/// `/title/<hi>/<lo>/content/<id>.app`
pub fn content_path(title_id: u64, content_id: u32) -> String {
    format!("{}/{:08x}.app", title_content_dir(title_id), content_id)
}

/// `/ticket/<hi>/<lo>.tik`
pub fn ticket_path(title_id: u64) -> String {
    format!("/ticket/{:08x}/{:08x}.tik", title_id >> 32, title_id as u32)
}
