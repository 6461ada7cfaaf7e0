// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;

use c64_core::util::{StateReader, StateWriter};

const REF_FREQ: f32 = 44100.0;

pub struct Filter {
    pub low_pass: Vec<f32>,
    pub band_pass: Vec<f32>,
    pub resonance: [f32; 16],
    pub amp_mod: [i8; 256],
    pub emulate: bool,
    pub filter_type: u8,
    pub cutoff_dy: f32,
    pub resonance_dy: f32,
}

struct VoiceFilterState {
    pub low: f32,
    pub reference: f32,
}

impl VoiceFilterState {
    fn new() -> Self {
        VoiceFilterState {
            low: 0.0,
            reference: 0.0,
        }
    }
}

impl Filter {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        let mut low_pass = vec![0f32; 0x800];
        let filter_fs = 400.0f32;
        let filter_fm = 60.0f32;
        let filter_ft = 0.05f32;
        for rk in 0..0x800u32 {
            let mut h =
                (((rk as f32 / 2048.0 * filter_fs.ln()).exp() / filter_fm) + filter_ft) * REF_FREQ
                    / sample_rate;
            if h < 0.01 {
                h = 0.01;
            }
            if h > 1.0 {
                h = 1.0;
            }
            low_pass[rk as usize] = h;
        }

        let mut band_pass = vec![0f32; 0x800];
        let y_min = 0.002f32;
        let y_add = (0.22f32 - y_min) / 2048.0;
        let mut y = y_min;
        for rk in 0..0x800usize {
            band_pass[rk] = y * REF_FREQ / sample_rate;
            y += y_add;
        }

        let mut resonance = [0f32; 16];
        let mut dy = 2.0f32;
        for uk in 0..16 {
            resonance[uk] = dy;
            dy -= (2.0 - 1.0) / 15.0;
        }
        resonance[0] = 2.0;
        resonance[15] = 1.0;

        let mut amp_mod = [0i8; 256];
        for si in 0..256i32 {
            amp_mod[si as usize] = ((si - 0x80) as f32 * 0.7) as i8;
        }

        Filter {
            low_pass,
            band_pass,
            resonance,
            amp_mod,
            emulate: true,
            filter_type: 0,
            cutoff_dy: 0.0,
            resonance_dy: 1.0,
        }
    }

    /// Recomputes cutoff_dy/resonance_dy from $D415-$D417; called whenever the
    /// filter registers are dirtied.
    pub fn update(&mut self, filter_type: u8, cutoff: u16, resonance_reg: u8) {
        self.filter_type = filter_type;
        let cutoff = (cutoff & 0x7ff) as usize;
        self.cutoff_dy = if filter_type == 0x20 {
            self.band_pass[cutoff]
        } else {
            self.low_pass[cutoff]
        };
        self.resonance_dy = (self.resonance[resonance_reg as usize] - self.cutoff_dy).max(1.0);
    }

    /// Lookup tables are deterministic from `sample_rate`, reconstructed at
    /// `new()` rather than dumped; only the register-driven fields travel.
    pub fn save_state(&self, w: &mut StateWriter) {
        w.write_bool(self.emulate);
        w.write_u8(self.filter_type);
        w.write_f32(self.cutoff_dy);
        w.write_f32(self.resonance_dy);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        self.emulate = r.read_bool();
        self.filter_type = r.read_u8();
        self.cutoff_dy = r.read_f32();
        self.resonance_dy = r.read_f32();
    }

    pub fn apply(&self, state: &mut VoiceFilterState, io: i8) -> i8 {
        let sample = io as f32;
        state.low += state.reference * self.cutoff_dy;
        let high = -state.low - state.reference * self.resonance_dy - sample;
        let high = match self.filter_type {
            0x10 => high,       // low pass
            0x20 => state.low,  // band pass (reported via low, matching FastSID's naming)
            0x40 => sample - state.low, // high pass
            _ => high,
        };
        state.reference += high * self.cutoff_dy;
        let clamped = if high > 127.0 {
            127.0
        } else if high < -128.0 {
            -128.0
        } else {
            high
        };
        clamped as i8
    }
}

pub struct VoiceFilter(VoiceFilterState);

impl VoiceFilter {
    pub fn new() -> Self {
        VoiceFilter(VoiceFilterState::new())
    }

    pub fn apply(&mut self, filter: &Filter, io: i8) -> i8 {
        filter.apply(&mut self.0, io)
    }

    pub fn reset(&mut self) {
        self.0 = VoiceFilterState::new();
    }

    pub fn save_state(&self, w: &mut StateWriter) {
        w.write_f32(self.0.low);
        w.write_f32(self.0.reference);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        self.0.low = r.read_f32();
        self.0.reference = r.read_f32();
    }
}
