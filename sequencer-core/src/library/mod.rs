//! Append-only registry of named sequences.
//!
//! Entries are registered once at startup and addressed by [`SequenceId`],
//! the registration index. The rotation driver walks ids `0..count()` in
//! order, so ids are dense and never reused.

use core::fmt;

use heapless::Vec;

use crate::device::DeviceConfig;
use crate::sequences::{
    BASIC_NAME, DILATING_NAME, MARCHING_NAME, MIXED_NAME, SWEEP_NAME, Sequence, ValidationError,
    basic_sequence, dilating_sequence, marching_sequence, mixed_sequence, sweep_sequence,
};

/// Default library capacity.
pub const MAX_LIBRARY_ENTRIES: usize = 8;

/// Position of an entry in the library.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SequenceId(u8);

impl SequenceId {
    /// Creates an identifier from a raw index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw index as stored in telemetry.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors returned by [`SequenceLibrary`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LibraryError {
    RegistryFull,
    DuplicateName,
    NotFound(SequenceId),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::RegistryFull => f.write_str("sequence library is full"),
            LibraryError::DuplicateName => f.write_str("sequence name already registered"),
            LibraryError::NotFound(id) => write!(f, "no sequence registered as {id}"),
        }
    }
}

impl core::error::Error for LibraryError {}

/// One named library entry.
#[derive(Clone, Debug)]
pub struct LibraryEntry {
    pub name: &'static str,
    pub sequence: Sequence,
}

/// Fixed-capacity collection of named sequences.
#[derive(Clone, Debug)]
pub struct SequenceLibrary<const CAPACITY: usize = MAX_LIBRARY_ENTRIES> {
    entries: Vec<LibraryEntry, CAPACITY>,
}

impl<const CAPACITY: usize> SequenceLibrary<CAPACITY> {
    /// Creates an empty library.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a sequence under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::DuplicateName`] when `name` is taken and
    /// [`LibraryError::RegistryFull`] when no slot is left.
    pub fn register(
        &mut self,
        name: &'static str,
        sequence: Sequence,
    ) -> Result<SequenceId, LibraryError> {
        if self.find(name).is_some() {
            return Err(LibraryError::DuplicateName);
        }

        let id = u8::try_from(self.entries.len())
            .map(SequenceId)
            .map_err(|_| LibraryError::RegistryFull)?;
        self.entries
            .push(LibraryEntry { name, sequence })
            .map_err(|_| LibraryError::RegistryFull)?;
        Ok(id)
    }

    /// Looks up a sequence by id.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] for ids past the end.
    pub fn get(&self, id: SequenceId) -> Result<&Sequence, LibraryError> {
        self.entries
            .get(id.index())
            .map(|entry| &entry.sequence)
            .ok_or(LibraryError::NotFound(id))
    }

    /// Name registered for `id`.
    #[must_use]
    pub fn name(&self, id: SequenceId) -> Option<&'static str> {
        self.entries.get(id.index()).map(|entry| entry.name)
    }

    /// Finds the id registered under `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SequenceId> {
        self.entries
            .iter()
            .position(|entry| entry.name == name)
            .and_then(|index| u8::try_from(index).ok())
            .map(SequenceId)
    }

    /// Number of registered sequences.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (SequenceId, &LibraryEntry)> + '_ {
        self.entries
            .iter()
            .zip(0u8..)
            .map(|(entry, index)| (SequenceId(index), entry))
    }
}

impl<const CAPACITY: usize> Default for SequenceLibrary<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure while populating the default presets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PresetError {
    Validation(ValidationError),
    Library(LibraryError),
}

impl From<ValidationError> for PresetError {
    fn from(value: ValidationError) -> Self {
        PresetError::Validation(value)
    }
}

impl From<LibraryError> for PresetError {
    fn from(value: LibraryError) -> Self {
        PresetError::Library(value)
    }
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::Validation(error) => write!(f, "preset rejected: {error}"),
            PresetError::Library(error) => write!(f, "preset not registered: {error}"),
        }
    }
}

impl core::error::Error for PresetError {}

/// Registers the presets that fit `config`.
///
/// Waveform configurations get the sweep preset; every other load mode gets
/// basic, dilating, marching and mixed, in that order.
///
/// # Errors
///
/// Returns [`PresetError`] when a preset does not fit `config` or the library
/// runs out of room.
pub fn register_default_presets<const CAPACITY: usize>(
    library: &mut SequenceLibrary<CAPACITY>,
    config: &DeviceConfig,
) -> Result<usize, PresetError> {
    if config.load_mode.has_frame_countertop() {
        library.register(SWEEP_NAME, sweep_sequence(config)?)?;
        return Ok(1);
    }

    library.register(BASIC_NAME, basic_sequence(config)?)?;
    library.register(DILATING_NAME, dilating_sequence(config)?)?;
    library.register(MARCHING_NAME, marching_sequence(config)?)?;
    library.register(MIXED_NAME, mixed_sequence(config)?)?;
    Ok(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DEFAULT_PINS;

    #[test]
    fn ids_follow_registration_order() {
        let config = DeviceConfig::default();
        let mut library: SequenceLibrary = SequenceLibrary::new();
        assert_eq!(register_default_presets(&mut library, &config), Ok(4));

        assert_eq!(library.count(), 4);
        assert_eq!(library.find(MARCHING_NAME), Some(SequenceId::new(2)));
        assert_eq!(library.name(SequenceId::new(0)), Some(BASIC_NAME));
        assert!(library.get(SequenceId::new(3)).is_ok());
        assert_eq!(
            library.get(SequenceId::new(4)).err(),
            Some(LibraryError::NotFound(SequenceId::new(4)))
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let config = DeviceConfig::default();
        let mut library: SequenceLibrary = SequenceLibrary::new();
        let sequence = basic_sequence(&config).expect("preset builds");
        library
            .register(BASIC_NAME, sequence.clone())
            .expect("first registration");
        assert_eq!(
            library.register(BASIC_NAME, sequence),
            Err(LibraryError::DuplicateName)
        );
    }

    #[test]
    fn full_library_refuses_more_entries() {
        let config = DeviceConfig::default();
        let mut library: SequenceLibrary<1> = SequenceLibrary::new();
        let sequence = basic_sequence(&config).expect("preset builds");
        library.register("one", sequence.clone()).expect("fits");
        assert_eq!(
            library.register("two", sequence),
            Err(LibraryError::RegistryFull)
        );
    }

    #[test]
    fn waveform_config_registers_sweep_only() {
        let config = DeviceConfig::waveform(DEFAULT_PINS, 1_000);
        let mut library: SequenceLibrary = SequenceLibrary::new();
        assert_eq!(register_default_presets(&mut library, &config), Ok(1));
        assert_eq!(library.find(SWEEP_NAME), Some(SequenceId::new(0)));
        assert_eq!(library.iter().count(), 1);
    }
}
