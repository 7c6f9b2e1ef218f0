//! OAT header, key/value store and per-dex table.
//!
//! The layout of the header depends on its version: before the first no-PIC
//! version, two image relocation fields sit between the trampoline offsets and
//! the image checksum. Versions are compared as raw 4-byte strings.

use crate::errors::ImageError;
use crate::parsers::{c_string, magic, version, Version};
use nom::bytes::streaming::take;
use nom::combinator::cond;
use nom::multi::count;
use nom::number::streaming::le_u32;
use nom::IResult;
use rw_utils::hexlify::concat_checksums;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OAT_MAGIC: &[u8; 4] = b"oat\n";
pub const OAT_HEADER_SIZE: usize = 64;

/// First version without the `image_patch_delta` and
/// `image_file_location_oat_data_begin` fields.
pub const FIRST_NO_PIC_VERSION: Version = Version(*b"162\0");

pub const IMAGE_LOCATION_KEY: &str = "image-location";
pub const BOOTCLASSPATH_KEY: &str = "bootclasspath";

/// Host build output marker; what follows `<marker><device>` is the path on
/// the device.
const PACKAGING_MARKER: &str = "/target/product/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OatDexFile {
    pub location: String,
    pub checksum: u32,
    pub dex_file_offset: u32,
    pub class_offsets_offset: u32,
    pub lookup_table_offset: u32,
    pub method_bss_mapping_offset: u32,
    pub type_bss_mapping_offset: u32,
    pub string_bss_mapping_offset: u32,
}

/// Decoded OAT header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OatInfo {
    pub version: Version,
    pub adler32_checksum: u32,
    pub instruction_set: u32,
    pub instruction_set_features_bitmap: u32,
    pub dex_file_count: u32,
    pub oat_dex_files_offset: u32,
    pub executable_offset: u32,
    pub interpreter_to_interpreter_bridge_offset: u32,
    pub interpreter_to_compiled_code_bridge_offset: u32,
    pub jni_dlsym_lookup_offset: u32,
    pub quick_generic_jni_trampoline_offset: u32,
    pub quick_imt_conflict_trampoline_offset: u32,
    pub image_patch_delta: Option<u32>,
    pub image_file_location_oat_data_begin: Option<u32>,
    pub image_file_location_oat_checksum: u32,
    pub key_value_store: BTreeMap<String, String>,
    pub dex_files: Vec<OatDexFile>,
}

impl OatInfo {
    /// Concatenation of the embedded dex files checksums.
    #[must_use]
    pub fn code_id(&self) -> String {
        concat_checksums(self.dex_files.iter().map(|dex| dex.checksum))
    }

    #[must_use]
    pub fn instruction_set_name(&self) -> &'static str {
        instruction_set_name(self.instruction_set)
    }

    /// Paths listed under `image-location` then `bootclasspath`.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        [IMAGE_LOCATION_KEY, BOOTCLASSPATH_KEY]
            .iter()
            .filter_map(|key| self.key_value_store.get(*key))
            .flat_map(|paths| paths.split(':'))
            .filter(|path| !path.is_empty())
            .map(trim_packaging_path)
            .collect()
    }
}

#[must_use]
pub fn instruction_set_name(isa: u32) -> &'static str {
    match isa {
        1 => "arm",
        2 => "arm64",
        3 => "thumb2",
        4 => "x86",
        5 => "x86_64",
        6 => "mips",
        7 => "mips64",
        _ => "none",
    }
}

/// Strips the host build output prefix of a path, if any.
#[must_use]
pub fn trim_packaging_path(path: &str) -> String {
    let Some(pos) = path.find(PACKAGING_MARKER) else {
        return path.to_string();
    };
    let after = &path[pos + PACKAGING_MARKER.len()..];
    match after.find('/') {
        Some(device_end) => after[device_end..].to_string(),
        None => path.to_string(),
    }
}

pub(crate) fn oat_header_parser(input: &[u8]) -> IResult<&[u8], OatInfo, ImageError> {
    let (input, _) = magic("oat", OAT_MAGIC)(input)?;
    let (input, version) = version(input)?;
    let (input, adler32_checksum) = le_u32(input)?;
    let (input, instruction_set) = le_u32(input)?;
    let (input, instruction_set_features_bitmap) = le_u32(input)?;
    let (input, dex_file_count) = le_u32(input)?;
    let (input, oat_dex_files_offset) = le_u32(input)?;
    let (input, executable_offset) = le_u32(input)?;
    let (input, interpreter_to_interpreter_bridge_offset) = le_u32(input)?;
    let (input, interpreter_to_compiled_code_bridge_offset) = le_u32(input)?;
    let (input, jni_dlsym_lookup_offset) = le_u32(input)?;
    let (input, quick_generic_jni_trampoline_offset) = le_u32(input)?;
    let (input, quick_imt_conflict_trampoline_offset) = le_u32(input)?;

    let has_pic_fields = version < FIRST_NO_PIC_VERSION;
    let (input, image_patch_delta) = cond(has_pic_fields, le_u32)(input)?;
    let (input, image_file_location_oat_data_begin) = cond(has_pic_fields, le_u32)(input)?;

    let (input, image_file_location_oat_checksum) = le_u32(input)?;
    let (input, key_value_store_size) = le_u32(input)?;
    let (input, store) = take(key_value_store_size as usize)(input)?;
    let key_value_store = key_value_store_parser(store)
        .map_err(|_| {
            nom::Err::Failure(ImageError::Structure(
                "oat",
                "malformed key/value store".to_string(),
            ))
        })?
        .1;

    log::trace!(
        "oat version {version} ({}), {dex_file_count} dex file(s), {} key(s)",
        instruction_set_name(instruction_set),
        key_value_store.len()
    );

    let (input, dex_files) = count(oat_dex_file_parser, dex_file_count as usize)(input)?;

    Ok((
        input,
        OatInfo {
            version,
            adler32_checksum,
            instruction_set,
            instruction_set_features_bitmap,
            dex_file_count,
            oat_dex_files_offset,
            executable_offset,
            interpreter_to_interpreter_bridge_offset,
            interpreter_to_compiled_code_bridge_offset,
            jni_dlsym_lookup_offset,
            quick_generic_jni_trampoline_offset,
            quick_imt_conflict_trampoline_offset,
            image_patch_delta,
            image_file_location_oat_data_begin,
            image_file_location_oat_checksum,
            key_value_store,
            dex_files,
        },
    ))
}

fn key_value_store_parser(input: &[u8]) -> IResult<&[u8], BTreeMap<String, String>, ImageError> {
    let mut store = BTreeMap::new();
    let mut rest = input;
    while !rest.is_empty() {
        let (r, key) = c_string(rest)?;
        let (r, value) = c_string(r)?;
        store.insert(key, value);
        rest = r;
    }
    Ok((rest, store))
}

fn oat_dex_file_parser(input: &[u8]) -> IResult<&[u8], OatDexFile, ImageError> {
    let (input, location_size) = le_u32(input)?;
    let (input, location) = take(location_size as usize)(input)?;
    let (input, checksum) = le_u32(input)?;
    let (input, dex_file_offset) = le_u32(input)?;
    let (input, class_offsets_offset) = le_u32(input)?;
    let (input, lookup_table_offset) = le_u32(input)?;
    let (input, method_bss_mapping_offset) = le_u32(input)?;
    let (input, type_bss_mapping_offset) = le_u32(input)?;
    let (input, string_bss_mapping_offset) = le_u32(input)?;
    Ok((
        input,
        OatDexFile {
            location: String::from_utf8_lossy(location).into_owned(),
            checksum,
            dex_file_offset,
            class_offsets_offset,
            lookup_table_offset,
            method_bss_mapping_offset,
            type_bss_mapping_offset,
            string_bss_mapping_offset,
        },
    ))
}
