use std::io::{Read, Write};

use crate::error::{ProfilerError, Result};
use crate::profile::Profile;

/// Writes profiles to caller-supplied sinks as JSON.
pub struct ProfileSerializer {}

impl ProfileSerializer {
    pub fn serialize(profile: &Profile) -> Result<String> {
        Ok(serde_json::to_string(profile)?)
    }

    pub fn write<W: Write>(profile: &Profile, sink: &mut W) -> Result<()> {
        serde_json::to_writer(&mut *sink, profile).map_err(|err| {
            if err.is_io() {
                ProfilerError::Io(err.into())
            } else {
                ProfilerError::Serialize(err)
            }
        })?;
        sink.flush()?;
        Ok(())
    }

    pub fn read<R: Read>(source: R) -> Result<Profile> {
        Ok(serde_json::from_reader(source)?)
    }
}
