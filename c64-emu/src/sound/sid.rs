// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use c64_core::factory::{Chip, SidModel, SoundOutput};
use c64_core::util::{Shared, StateReader, StateWriter};

use super::filter::{Filter, VoiceFilter};
use super::voice::{reg as voice_regs, Voice};
use super::wave::WaveTables;

// Reference: MOS 6581/8580 SID, FastSID algorithm (VICE 3.x)

const ADR_TABLE: [u32; 16] = [
    1, 4, 8, 12, 19, 28, 34, 40, 50, 125, 250, 400, 500, 1500, 2500, 4000,
];

pub mod reg {
    pub const FC_LO: u8 = 0x15;
    pub const FC_HI: u8 = 0x16;
    pub const RES_FILT: u8 = 0x17;
    pub const MODE_VOL: u8 = 0x18;
    pub const POTX: u8 = 0x19;
    pub const POTY: u8 = 0x1a;
    pub const OSC3: u8 = 0x1b;
    pub const ENV3: u8 = 0x1c;
}

pub struct Sid {
    // Configuration
    chip_model: SidModel,
    sample_rate: u32,
    cpu_frequency: u32,
    // Functional units
    voices: [Voice; 3],
    filter: Filter,
    voice_filters: [VoiceFilter; 3],
    wave_tables: WaveTables,
    adrs: [u32; 16],
    sz: [u32; 16],
    speed1: u32,
    // Registers
    fc: u16,
    res_filt: u8,
    mode_vol: u8,
    last_store: u8,
    // Sample generation
    cycles_accum: u32,
    buffer: super::sound_buffer::SoundBuffer,
    output: Option<Shared<dyn SoundOutput>>,
}

impl Sid {
    pub fn new(chip_model: SidModel, cpu_frequency: u32, sample_rate: u32) -> Self {
        let speed1 = ((cpu_frequency as u64) << 8) as u32 / sample_rate;
        let mut adrs = [0u32; 16];
        let mut sz = [0u32; 16];
        for i in 0..16 {
            adrs[i] = 500 * 8 * speed1 / ADR_TABLE[i];
            sz[i] = 0x0888_8888 * i as u32;
        }
        Sid {
            chip_model,
            sample_rate,
            cpu_frequency,
            voices: [Voice::new(), Voice::new(), Voice::new()],
            filter: Filter::new(sample_rate),
            voice_filters: [VoiceFilter::new(), VoiceFilter::new(), VoiceFilter::new()],
            wave_tables: WaveTables::new(),
            adrs,
            sz,
            speed1,
            fc: 0,
            res_filt: 0,
            mode_vol: 0,
            last_store: 0,
            cycles_accum: 0,
            buffer: super::sound_buffer::SoundBuffer::new(),
            output: None,
        }
    }

    pub fn set_output(&mut self, output: Shared<dyn SoundOutput>) {
        self.output = Some(output);
    }

    pub fn buffer(&self) -> &super::sound_buffer::SoundBuffer {
        &self.buffer
    }

    fn volume(&self) -> u8 {
        self.mode_vol & 0x0f
    }

    fn filter_type(&self) -> u8 {
        self.mode_vol & 0x70
    }

    fn voice3_off(&self) -> bool {
        self.mode_vol.get_bit(7)
    }

    fn filter_routes(&self, voice: usize) -> bool {
        self.res_filt.get_bit(voice)
    }

    fn resonance(&self) -> u8 {
        self.res_filt >> 4
    }

    fn refresh_filter(&mut self) {
        self.filter.update(self.filter_type(), self.fc, self.resonance());
    }

    fn calculate_single_sample(&mut self) -> i16 {
        let overflow = [
            self.voices[0].clock_counter(),
            self.voices[1].clock_counter(),
            self.voices[2].clock_counter(),
        ];
        // voice i syncs off the overflow of voice (i + 2) % 3, i.e. the voice
        // that precedes it in the ring.
        let sync = [
            overflow[2] && self.voices[0].sync,
            overflow[0] && self.voices[1].sync,
            overflow[1] && self.voices[2].sync,
        ];
        for i in 0..3 {
            if sync[i] {
                self.voices[i].hard_sync();
            }
        }

        for voice in self.voices.iter_mut() {
            voice.clock_envelope(&self.adrs, &self.sz);
        }

        let prev_msb = [
            self.voices[2].counter.get_bit(31),
            self.voices[0].counter.get_bit(31),
            self.voices[1].counter.get_bit(31),
        ];

        let mut osc = [0i64; 3];
        for i in 0..3 {
            let ring_xor = self.voices[i].ring && prev_msb[i];
            let raw = self.voices[i].doosc(&self.wave_tables, ring_xor) as u64;
            let env = (self.voices[i].envelope.counter >> 16) as u64;
            osc[i] = (env * raw) as i64;
        }
        if self.voice3_off() && !self.filter_routes(2) {
            osc[2] = 0;
        }

        if self.filter.emulate {
            for i in 0..3 {
                let io = self.filter.amp_mod[((osc[i] >> 22) & 0xff) as usize];
                let filtered = if self.filter_routes(i) {
                    self.voice_filters[i].apply(&self.filter, io)
                } else {
                    io
                };
                osc[i] = ((filtered as i64) + 0x80) << (7 + 15);
            }
        }

        let mix = (((osc[0] + osc[1] + osc[2]) >> 20) - 0x600) * self.volume() as i64;
        mix.max(i16::min_value() as i64).min(i16::max_value() as i64) as i16
    }

    /// `adrs`/`sz`/`speed1`/the filter lookup tables are derived once from
    /// `chip_model`/`cpu_frequency`/`sample_rate` at construction and never
    /// change, so only the voices, filter and shared registers travel.
    pub fn save_state(&self, w: &mut StateWriter) {
        for voice in &self.voices {
            voice.save_state(w);
        }
        self.filter.save_state(w);
        for vf in &self.voice_filters {
            vf.save_state(w);
        }
        w.write_u16(self.fc);
        w.write_u8(self.res_filt);
        w.write_u8(self.mode_vol);
        w.write_u8(self.last_store);
        w.write_u32(self.cycles_accum);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        for voice in self.voices.iter_mut() {
            voice.load_state(r);
        }
        self.filter.load_state(r);
        for vf in self.voice_filters.iter_mut() {
            vf.load_state(r);
        }
        self.fc = r.read_u16();
        self.res_filt = r.read_u8();
        self.mode_vol = r.read_u8();
        self.last_store = r.read_u8();
        self.cycles_accum = r.read_u32();
    }
}

impl Chip for Sid {
    fn clock(&mut self) {
        self.cycles_accum += 1;
        // sample once every cpu_frequency/sample_rate cycles
        if self.cycles_accum as u64 * self.sample_rate as u64 >= self.cpu_frequency as u64 {
            self.cycles_accum = 0;
            let sample = self.calculate_single_sample();
            self.buffer.push(sample);
            if let Some(ref output) = self.output {
                output.borrow().write(&[sample]);
            }
        }
    }

    fn clock_delta(&mut self, delta: u32) {
        for _ in 0..delta {
            Chip::clock(self);
        }
    }

    fn process_vsync(&mut self) {}

    fn reset(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.reset();
        }
        for vf in self.voice_filters.iter_mut() {
            vf.reset();
        }
        self.fc = 0;
        self.res_filt = 0;
        self.mode_vol = 0;
        self.last_store = 0;
        self.cycles_accum = 0;
        self.buffer.reset();
        self.refresh_filter();
        if let Some(ref output) = self.output {
            output.borrow().reset();
        }
    }

    fn read(&mut self, reg: u8) -> u8 {
        match reg {
            reg::POTX | reg::POTY => 0xff,
            reg::OSC3 => (self.voices[2].doosc(&self.wave_tables, false) >> 7) as u8,
            reg::ENV3 => (self.voices[2].envelope.counter >> 23) as u8,
            _ => self.last_store,
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        self.last_store = value;
        match reg {
            0x00..=0x06 => self.voices[0].write(voice_index(reg), value, self.speed1, &self.adrs, &self.sz),
            0x07..=0x0d => self.voices[1].write(voice_index(reg - 0x07), value, self.speed1, &self.adrs, &self.sz),
            0x0e..=0x14 => self.voices[2].write(voice_index(reg - 0x0e), value, self.speed1, &self.adrs, &self.sz),
            reg::FC_LO => {
                self.fc = (self.fc & 0x7f8) | (value as u16 & 0x07);
                self.refresh_filter();
            }
            reg::FC_HI => {
                self.fc = (self.fc & 0x007) | ((value as u16) << 3);
                self.refresh_filter();
            }
            reg::RES_FILT => {
                self.res_filt = value;
                self.refresh_filter();
            }
            reg::MODE_VOL => {
                self.mode_vol = value;
                self.refresh_filter();
            }
            _ => {}
        }
    }
}

fn voice_index(reg: u8) -> usize {
    match reg {
        0x00 => voice_regs::FREQ_LO,
        0x01 => voice_regs::FREQ_HI,
        0x02 => voice_regs::PW_LO,
        0x03 => voice_regs::PW_HI,
        0x04 => voice_regs::CONTROL,
        0x05 => voice_regs::AD,
        0x06 => voice_regs::SR,
        _ => panic!("invalid voice register {}", reg),
    }
}
