// Copyright (C) 2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use serde::Deserialize;

use crate::Config;
use crate::Error;

/// Congestion control settings, as read from a configuration file.
///
/// Every field is optional and falls back to the same default as
/// [`Config::new()`]. Convert into a validated [`Config`] with `TryFrom`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct CongestionSettings {
    /// Congestion control algorithm name, `reno` or `newreno`.
    ///
    /// Defaults to `newreno`.
    #[serde(default = "CongestionSettings::default_cc_algorithm")]
    pub cc_algorithm: String,

    /// Sender maximum segment size, in bytes.
    ///
    /// Defaults to `536`.
    #[serde(default = "CongestionSettings::default_segment_size")]
    pub segment_size: usize,

    /// Number of duplicate ACKs that triggers fast retransmit.
    ///
    /// Defaults to `3`.
    #[serde(default = "CongestionSettings::default_dup_ack_threshold")]
    pub dup_ack_threshold: u32,

    /// Initial congestion window, in segments.
    ///
    /// Defaults to `1`.
    #[serde(
        default = "CongestionSettings::default_initial_congestion_window_segments"
    )]
    pub initial_congestion_window_segments: usize,

    /// Initial slow start threshold, in bytes.
    ///
    /// Defaults to `65535`.
    #[serde(default = "CongestionSettings::default_initial_ssthresh")]
    pub initial_ssthresh: usize,
}

impl CongestionSettings {
    #[inline]
    fn default_cc_algorithm() -> String {
        "newreno".to_string()
    }

    #[inline]
    fn default_segment_size() -> usize {
        crate::DEFAULT_SEGMENT_SIZE
    }

    #[inline]
    fn default_dup_ack_threshold() -> u32 {
        crate::DEFAULT_DUP_ACK_THRESHOLD
    }

    #[inline]
    fn default_initial_congestion_window_segments() -> usize {
        crate::DEFAULT_INITIAL_CONGESTION_WINDOW_SEGMENTS
    }

    #[inline]
    fn default_initial_ssthresh() -> usize {
        crate::DEFAULT_INITIAL_SSTHRESH
    }
}

impl Default for CongestionSettings {
    fn default() -> Self {
        CongestionSettings {
            cc_algorithm: Self::default_cc_algorithm(),
            segment_size: Self::default_segment_size(),
            dup_ack_threshold: Self::default_dup_ack_threshold(),
            initial_congestion_window_segments:
                Self::default_initial_congestion_window_segments(),
            initial_ssthresh: Self::default_initial_ssthresh(),
        }
    }
}

impl TryFrom<&CongestionSettings> for Config {
    type Error = Error;

    fn try_from(settings: &CongestionSettings) -> Result<Self, Self::Error> {
        let mut config = Config::new(settings.segment_size)?;

        config.set_cc_algorithm_name(&settings.cc_algorithm)?;
        config.set_dup_ack_threshold(settings.dup_ack_threshold)?;
        config.set_initial_congestion_window_segments(
            settings.initial_congestion_window_segments,
        )?;
        config.set_initial_ssthresh(settings.initial_ssthresh)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::CongestionControlAlgorithm;

    #[test]
    fn defaults_match_config() {
        let settings: CongestionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, CongestionSettings::default());

        let config = Config::try_from(&settings).unwrap();
        assert_eq!(config, Config::new(crate::DEFAULT_SEGMENT_SIZE).unwrap());
    }

    #[test]
    fn parse() {
        let settings: CongestionSettings = serde_json::from_str(
            r#"{
                "cc_algorithm": "Reno",
                "segment_size": 1460,
                "dup_ack_threshold": 4,
                "initial_congestion_window_segments": 10,
                "initial_ssthresh": 100000
            }"#,
        )
        .unwrap();

        let config = Config::try_from(&settings).unwrap();

        assert_eq!(config.cc_algorithm(), CongestionControlAlgorithm::Reno);
        assert_eq!(config.segment_size(), 1460);
        assert_eq!(config.dup_ack_threshold(), 4);
        assert_eq!(config.initial_congestion_window(), 14600);
        assert_eq!(config.initial_ssthresh(), 100000);
    }

    #[test]
    fn unknown_field() {
        let res = serde_json::from_str::<CongestionSettings>(
            r#"{ "pacing": true }"#,
        );

        assert!(res.is_err());
    }

    #[test]
    fn invalid_values() {
        let mut settings = CongestionSettings {
            cc_algorithm: "cubic".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Config::try_from(&settings),
            Err(Error::CongestionControl)
        );

        settings.cc_algorithm = "reno".to_string();
        settings.segment_size = 0;
        assert_eq!(Config::try_from(&settings), Err(Error::InvalidConfig));

        settings.segment_size = 1000;
        settings.dup_ack_threshold = 0;
        assert_eq!(Config::try_from(&settings), Err(Error::InvalidConfig));

        settings.dup_ack_threshold = 3;
        settings.initial_ssthresh = 1;
        assert_eq!(Config::try_from(&settings), Err(Error::InvalidConfig));

        settings.initial_ssthresh = 2;
        assert!(Config::try_from(&settings).is_ok());

        settings.initial_congestion_window_segments = usize::MAX / 2;
        assert_eq!(Config::try_from(&settings), Err(Error::InvalidConfig));
    }
}
