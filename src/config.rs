use std::env;

use crate::constants::*;
use crate::error::ConfigError;

/// Sizes of the simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    frame_size: usize,
    memory_size: usize,
    page_table_size: usize,
}

impl MemoryConfig {
    /// Validate a frame size / memory size pair. The page table capacity is
    /// derived as `memory_size / frame_size`.
    pub fn new(frame_size: usize, memory_size: usize) -> Result<Self, ConfigError> {
        if frame_size == 0 || !frame_size.is_power_of_two() {
            return Err(ConfigError::InvalidFrameSize(frame_size));
        }
        // frame 0 doubles as the unmapped sentinel, so at least one more is needed
        if memory_size % frame_size != 0 || memory_size / frame_size < 2 {
            return Err(ConfigError::InvalidMemorySize { memory_size, frame_size });
        }

        Ok(MemoryConfig {
            frame_size,
            memory_size,
            page_table_size: memory_size / frame_size,
        })
    }

    /// Override the derived page table capacity
    pub fn with_page_table_size(mut self, page_table_size: usize) -> Result<Self, ConfigError> {
        if page_table_size < 2 {
            return Err(ConfigError::InvalidPageTableSize(page_table_size));
        }
        self.page_table_size = page_table_size;
        Ok(self)
    }

    /// Read the configuration from `PAGING_SIM_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but with an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| -> Result<Option<usize>, ConfigError> {
            match lookup(key) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| ConfigError::Parse { key: key.to_string(), value }),
            }
        };

        let frame_size = parse(ENV_FRAME_SIZE)?.unwrap_or(FRAME_SIZE);
        let memory_size = parse(ENV_MEMORY_SIZE)?.unwrap_or(DEFAULT_MEMORY_SIZE);
        let config = Self::new(frame_size, memory_size)?;

        match parse(ENV_PAGE_TABLE_SIZE)? {
            Some(size) => config.with_page_table_size(size),
            None => Ok(config),
        }
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline]
    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    #[inline]
    pub fn page_table_size(&self) -> usize {
        self.page_table_size
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.memory_size / self.frame_size
    }

    #[inline]
    pub fn offset_bits(&self) -> u32 {
        self.frame_size.trailing_zeros()
    }

    #[inline]
    pub fn offset_mask(&self) -> usize {
        self.frame_size - 1
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            frame_size: FRAME_SIZE,
            memory_size: DEFAULT_MEMORY_SIZE,
            page_table_size: DEFAULT_PAGE_TABLE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.frame_size(), 4096);
        assert_eq!(config.memory_size(), 1024 * 1024);
        assert_eq!(config.page_table_size(), 256);
        assert_eq!(config.num_frames(), 256);
        assert_eq!(config.offset_bits(), 12);
        assert_eq!(config.offset_mask(), 0xFFF);
    }

    #[test]
    fn test_new_derives_page_table_size() {
        let config = MemoryConfig::new(512, 8 * 512).unwrap();
        assert_eq!(config.page_table_size(), 8);
        assert_eq!(config.num_frames(), 8);
    }

    #[test]
    fn test_rejects_non_power_of_two_frame() {
        assert_eq!(
            MemoryConfig::new(3000, 30000),
            Err(ConfigError::InvalidFrameSize(3000))
        );
        assert_eq!(MemoryConfig::new(0, 4096), Err(ConfigError::InvalidFrameSize(0)));
    }

    #[test]
    fn test_rejects_memory_not_multiple_of_frame() {
        assert!(matches!(
            MemoryConfig::new(4096, 4096 * 3 + 1),
            Err(ConfigError::InvalidMemorySize { .. })
        ));
        // a single frame would only hold the reserved frame 0
        assert!(matches!(
            MemoryConfig::new(4096, 4096),
            Err(ConfigError::InvalidMemorySize { .. })
        ));
    }

    #[test]
    fn test_page_table_override() {
        let config = MemoryConfig::new(4096, 4 * 4096)
            .unwrap()
            .with_page_table_size(16)
            .unwrap();
        assert_eq!(config.page_table_size(), 16);
        assert_eq!(config.num_frames(), 4);

        assert_eq!(
            MemoryConfig::default().with_page_table_size(1),
            Err(ConfigError::InvalidPageTableSize(1))
        );
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = MemoryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, MemoryConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let config = MemoryConfig::from_lookup(lookup_from(&[
            (ENV_FRAME_SIZE, "1024"),
            (ENV_MEMORY_SIZE, " 16384 "),
            (ENV_PAGE_TABLE_SIZE, "32"),
        ]))
        .unwrap();

        assert_eq!(config.frame_size(), 1024);
        assert_eq!(config.memory_size(), 16384);
        assert_eq!(config.num_frames(), 16);
        assert_eq!(config.page_table_size(), 32);
    }

    #[test]
    fn test_from_lookup_parse_error() {
        let err = MemoryConfig::from_lookup(lookup_from(&[(ENV_MEMORY_SIZE, "1MiB")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Parse {
                key: ENV_MEMORY_SIZE.to_string(),
                value: "1MiB".to_string(),
            }
        );
    }

    #[test]
    fn test_from_lookup_validates() {
        let err = MemoryConfig::from_lookup(lookup_from(&[(ENV_FRAME_SIZE, "1000")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidFrameSize(1000));
    }
}
