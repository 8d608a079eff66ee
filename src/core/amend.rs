/*!
 * Identity tag file amendment
 *
 * Declares BagIt 1.0 in `bagit.txt` and replaces the date-only
 * `Bagging-Date` with a second-precision `Bagging-DateTime`.
 */

use chrono::{DateTime, TimeZone};

use bagsmith_core_manifest::{labels, Bag, BagDeclaration, BAGIT_VERSION};

use super::journal::Journal;
use crate::error::{BuildError, Result};

const ORIGIN: &str = "amending";

/// Render a capture time as `YYYY-MM-DDThh:mm:ss±hh:mm`
pub fn format_bagging_datetime<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Rewrite `bagit.txt` and `bag-info.txt`
///
/// Tag-manifests are not recomputed here; the bag is left marked stale.
pub fn amend<Tz>(bag: &mut Bag, captured_at: &DateTime<Tz>, journal: &mut Journal) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut declaration = bag
        .declaration()
        .map_err(|e| BuildError::packaging(format!("Cannot amend bagit.txt: {}", e)))?;
    let previous = std::mem::replace(&mut declaration.version, BAGIT_VERSION.to_string());
    bag.write_declaration(&declaration)?;
    journal.info(
        ORIGIN,
        format!("BagIt-Version {} -> {}", previous, BAGIT_VERSION),
    );

    let mut info = bag
        .bag_info()
        .map_err(|e| BuildError::packaging(format!("Cannot amend bag-info.txt: {}", e)))?;
    let removed = info.remove(labels::BAGGING_DATE);
    let stamp = format_bagging_datetime(captured_at);
    info.set(labels::BAGGING_DATETIME, stamp.as_str());
    bag.write_bag_info(&info)?;
    journal.info(
        ORIGIN,
        format!(
            "{} set to {} ({} {} field(s) removed)",
            labels::BAGGING_DATETIME,
            stamp,
            removed,
            labels::BAGGING_DATE
        ),
    );

    Ok(())
}
