// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use c64_core::util::{StateReader, StateWriter};

use super::envelope::Envelope;
use super::wave::WaveTables;

const NOISE_SEED: u32 = 0x7f_fff8;

pub mod reg {
    pub const FREQ_LO: usize = 0x00;
    pub const FREQ_HI: usize = 0x01;
    pub const PW_LO: usize = 0x02;
    pub const PW_HI: usize = 0x03;
    pub const CONTROL: usize = 0x04;
    pub const AD: usize = 0x05;
    pub const SR: usize = 0x06;
}

pub struct Voice {
    pub freq: u16,
    pub pw: u16,
    pub gate: bool,
    pub sync: bool,
    pub ring: bool,
    pub test: bool,
    pub triangle: bool,
    pub sawtooth: bool,
    pub pulse: bool,
    pub noise: bool,
    pub envelope: Envelope,
    pub counter: u32,
    pub step: u32,
    pub noise_shift: u32,
}

impl Voice {
    pub fn new() -> Self {
        Voice {
            freq: 0,
            pw: 0,
            gate: false,
            sync: false,
            ring: false,
            test: false,
            triangle: false,
            sawtooth: false,
            pulse: false,
            noise: false,
            envelope: Envelope::new(),
            counter: 0,
            step: 0,
            noise_shift: NOISE_SEED,
        }
    }

    pub fn reset(&mut self) {
        *self = Voice::new();
    }

    pub fn write(&mut self, reg: usize, value: u8, speed1: u32, adrs: &[u32; 16], sz: &[u32; 16]) {
        match reg {
            reg::FREQ_LO => {
                self.freq = (self.freq & 0xff00) | value as u16;
                self.update_step(speed1);
            }
            reg::FREQ_HI => {
                self.freq = (self.freq & 0x00ff) | ((value as u16) << 8);
                self.update_step(speed1);
            }
            reg::PW_LO => self.pw = (self.pw & 0x0f00) | value as u16,
            reg::PW_HI => self.pw = (self.pw & 0x00ff) | (((value & 0x0f) as u16) << 8),
            reg::CONTROL => {
                self.noise = value.get_bit(7);
                self.pulse = value.get_bit(6);
                self.sawtooth = value.get_bit(5);
                self.triangle = value.get_bit(4);
                self.test = value.get_bit(3);
                self.ring = value.get_bit(2);
                self.sync = value.get_bit(1);
                if self.test {
                    self.counter = 0;
                    self.noise_shift = NOISE_SEED;
                }
                self.envelope.set_gate(value.get_bit(0), adrs, sz);
            }
            reg::AD => {
                self.envelope.attack = value >> 4;
                self.envelope.decay = value & 0x0f;
                if self.envelope.phase == super::envelope::Phase::Attack {
                    self.envelope.set_phase(super::envelope::Phase::Attack, adrs, sz);
                } else if self.envelope.phase == super::envelope::Phase::Decay {
                    self.envelope.set_phase(super::envelope::Phase::Decay, adrs, sz);
                }
            }
            reg::SR => {
                self.envelope.sustain = value >> 4;
                self.envelope.release = value & 0x0f;
                if self.envelope.phase == super::envelope::Phase::Sustain {
                    self.envelope.set_phase(super::envelope::Phase::Sustain, adrs, sz);
                } else if self.envelope.phase == super::envelope::Phase::Release {
                    self.envelope.set_phase(super::envelope::Phase::Release, adrs, sz);
                }
            }
            _ => panic!("invalid voice register {}", reg),
        }
    }

    fn update_step(&mut self, speed1: u32) {
        self.step = speed1.wrapping_mul(self.freq as u32);
    }

    /// Advances the waveform counter by one sample, returns true on overflow
    /// (used by the caller to drive hard sync into the next voice).
    pub fn clock_counter(&mut self) -> bool {
        if self.test {
            return false;
        }
        let (next, overflow) = self.counter.overflowing_add(self.step);
        self.counter = next;
        if overflow {
            self.noise_shift = nshift(self.noise_shift, 16);
        }
        overflow
    }

    pub fn hard_sync(&mut self) {
        let bits = (self.counter >> 28) as u32;
        self.noise_shift = nshift(self.noise_shift, bits);
        self.counter = 0;
    }

    pub fn doosc(&self, tables: &WaveTables, ring_xor: bool) -> u16 {
        if self.noise {
            return tables.noise(self.noise_shift);
        }
        let index = ((self.counter >> 20) & 0x0fff) as usize;
        let mut value = match (self.triangle, self.sawtooth) {
            (true, true) => tables.triangle_sawtooth[index],
            (true, false) => tables.triangle[index],
            (false, true) => tables.sawtooth[index],
            (false, false) => 0xffff,
        };
        if self.triangle && ring_xor {
            value ^= 0x7fff;
        }
        if self.pulse {
            let pulse_high = self.test || index as u16 >= self.pw;
            let pulse_bit = if pulse_high { 0x7fffu16 } else { 0 };
            value &= pulse_bit;
        }
        if !self.triangle && !self.sawtooth && !self.pulse {
            0
        } else {
            value
        }
    }

    pub fn clock_envelope(&mut self, adrs: &[u32; 16], sz: &[u32; 16]) {
        self.envelope.clock(adrs, sz);
    }

    pub fn save_state(&self, w: &mut StateWriter) {
        w.write_u16(self.freq);
        w.write_u16(self.pw);
        w.write_bool(self.gate);
        w.write_bool(self.sync);
        w.write_bool(self.ring);
        w.write_bool(self.test);
        w.write_bool(self.triangle);
        w.write_bool(self.sawtooth);
        w.write_bool(self.pulse);
        w.write_bool(self.noise);
        self.envelope.save_state(w);
        w.write_u32(self.counter);
        w.write_u32(self.step);
        w.write_u32(self.noise_shift);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        self.freq = r.read_u16();
        self.pw = r.read_u16();
        self.gate = r.read_bool();
        self.sync = r.read_bool();
        self.ring = r.read_bool();
        self.test = r.read_bool();
        self.triangle = r.read_bool();
        self.sawtooth = r.read_bool();
        self.pulse = r.read_bool();
        self.noise = r.read_bool();
        self.envelope.load_state(r);
        self.counter = r.read_u32();
        self.step = r.read_u32();
        self.noise_shift = r.read_u32();
    }
}

fn nshift(v: u32, n: u32) -> u32 {
    if n == 0 {
        return v;
    }
    (v << n) | ((((v >> (23 - n)) ^ (v >> (18 - n))) & ((1 << n) - 1)) & 0x00ff_ffff)
}
