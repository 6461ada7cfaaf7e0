// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{Pin, Shared, StateReader, StateWriter};

// Spec: 6526 COMPLEX INTERFACE ADAPTER (CIA) Datasheet, TIMER A/TIMER B

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    TimerA,
    TimerB,
}

#[derive(Copy, Clone, PartialEq)]
enum InputMode {
    SystemClock,
    Cnt,
    TimerAUnderflow,
    TimerAUnderflowWithCnt,
}

#[derive(Copy, Clone, PartialEq)]
enum OutputMode {
    Pulse,
    Toggle,
}

pub struct Timer {
    mode: Mode,
    cnt_pin: Shared<Pin>,
    enabled: bool,
    one_shot: bool,
    input: InputMode,
    output: OutputMode,
    pb_on: bool,
    force_load: bool,
    latch: u16,
    counter: u16,
    pb_output: bool,
    source: bool,
}

impl Timer {
    pub fn new(mode: Mode, cnt_pin: Shared<Pin>) -> Self {
        Timer {
            mode,
            cnt_pin,
            enabled: false,
            one_shot: false,
            input: InputMode::SystemClock,
            output: OutputMode::Pulse,
            pb_on: false,
            force_load: false,
            latch: 0xffff,
            counter: 0xffff,
            pb_output: false,
            source: false,
        }
    }

    /// Feeds timer A's underflow pulse into timer B's count-source chain.
    pub fn feed_source(&mut self, timer_a_underflow: bool) {
        self.source = timer_a_underflow;
    }

    /// Advances the timer by one phi2 cycle and returns true on underflow.
    pub fn clock(&mut self) -> bool {
        if self.force_load {
            self.counter = self.latch;
            self.force_load = false;
        }
        let counts = self.enabled
            && match self.input {
                InputMode::SystemClock => true,
                InputMode::Cnt => self.cnt_pin.borrow().is_rising(),
                InputMode::TimerAUnderflow => self.source,
                InputMode::TimerAUnderflowWithCnt => self.source && self.cnt_pin.borrow().is_high(),
            };
        let mut underflow = false;
        if counts {
            if self.counter == 0 {
                underflow = true;
                self.counter = self.latch;
                if self.one_shot {
                    self.enabled = false;
                }
            } else {
                self.counter -= 1;
            }
        }
        if underflow {
            self.pb_output = match self.output {
                OutputMode::Pulse => true,
                OutputMode::Toggle => !self.pb_output,
            };
        } else if self.output == OutputMode::Pulse {
            self.pb_output = false;
        }
        underflow
    }

    pub fn reset(&mut self) {
        self.enabled = false;
        self.one_shot = false;
        self.input = InputMode::SystemClock;
        self.output = OutputMode::Pulse;
        self.pb_on = false;
        self.force_load = false;
        self.latch = 0xffff;
        self.counter = 0xffff;
        self.pb_output = false;
        self.source = false;
    }

    pub fn is_pb_on(&self) -> bool {
        self.pb_on
    }

    pub fn get_pb_output(&self) -> bool {
        self.pb_output
    }

    pub fn get_counter(&self) -> u16 {
        self.counter
    }

    pub fn get_counter_lo(&self) -> u8 {
        (self.counter & 0x00ff) as u8
    }

    pub fn get_counter_hi(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    pub fn get_latch(&self) -> u16 {
        self.latch
    }

    pub fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | (value as u16);
    }

    pub fn set_latch_hi(&mut self, value: u8) {
        self.latch = (self.latch & 0x00ff) | ((value as u16) << 8);
        if !self.enabled {
            self.force_load = true;
        }
    }

    pub fn get_config(&self) -> u8 {
        let mut result = 0u8;
        result.set_bit(0, self.enabled);
        result.set_bit(1, self.pb_on);
        result.set_bit(2, self.output == OutputMode::Toggle);
        result.set_bit(3, self.one_shot);
        match self.mode {
            Mode::TimerA => {
                result.set_bit(5, self.input == InputMode::Cnt);
            }
            Mode::TimerB => {
                let bits = match self.input {
                    InputMode::SystemClock => 0,
                    InputMode::Cnt => 1,
                    InputMode::TimerAUnderflow => 2,
                    InputMode::TimerAUnderflowWithCnt => 3,
                };
                result.set_bits(5..7, bits);
            }
        }
        result
    }

    pub fn set_config(&mut self, value: u8) {
        self.enabled = value.get_bit(0);
        self.pb_on = value.get_bit(1);
        self.output = if value.get_bit(2) {
            OutputMode::Toggle
        } else {
            OutputMode::Pulse
        };
        self.one_shot = value.get_bit(3);
        if value.get_bit(4) {
            self.force_load = true;
        }
        self.input = match self.mode {
            Mode::TimerA => {
                if value.get_bit(5) {
                    InputMode::Cnt
                } else {
                    InputMode::SystemClock
                }
            }
            Mode::TimerB => match value.get_bits(5..7) {
                0 => InputMode::SystemClock,
                1 => InputMode::Cnt,
                2 => InputMode::TimerAUnderflow,
                3 => InputMode::TimerAUnderflowWithCnt,
                _ => unreachable!(),
            },
        };
    }

    pub fn save_state(&self, w: &mut StateWriter) {
        w.write_u8(self.get_config());
        w.write_u16(self.counter);
        w.write_u16(self.latch);
        w.write_bool(self.force_load);
        w.write_bool(self.pb_output);
        w.write_bool(self.source);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        self.set_config(r.read_u8());
        self.counter = r.read_u16();
        self.latch = r.read_u16();
        self.force_load = r.read_bool();
        self.pb_output = r.read_bool();
        self.source = r.read_bool();
    }
}
