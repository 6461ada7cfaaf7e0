// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use c64_core::factory::{Chip, VicModel, VideoOutput};
use c64_core::util::{IrqLine, Pin, Shared, StateReader, StateWriter};

use super::border_unit::BorderUnit;
use super::gfx_sequencer::{GfxSequencer, Mode};
use super::mux_unit::MuxUnit;
use super::render_target::RenderTarget;
use super::spec::Spec;
use super::sprite_sequencer::{Mode as SpriteMode, SpriteSequencer};
use super::vic_memory::VicMemory;

// Reference: The MOS 6567/6569 video controller (VIC-II) and its application in the Commodore 64

#[derive(Copy, Clone)]
pub enum Reg {
    M0X = 0x00,
    M0Y = 0x01,
    M1X = 0x02,
    M1Y = 0x03,
    M2X = 0x04,
    M2Y = 0x05,
    M3X = 0x06,
    M3Y = 0x07,
    M4X = 0x08,
    M4Y = 0x09,
    M5X = 0x0a,
    M5Y = 0x0b,
    M6X = 0x0c,
    M6Y = 0x0d,
    M7X = 0x0e,
    M7Y = 0x0f,
    MX8 = 0x10,
    CR1 = 0x11,
    RASTER = 0x12,
    LPX = 0x13,
    LPY = 0x14,
    ME = 0x15,
    CR2 = 0x16,
    MYE = 0x17,
    MEMPTR = 0x18,
    IRR = 0x19,
    IMR = 0x1a,
    MDP = 0x1b,
    MMC = 0x1c,
    MXE = 0x1d,
    MM = 0x1e,
    MD = 0x1f,
    EC = 0x20,
    B0C = 0x21,
    B1C = 0x22,
    B2C = 0x23,
    B3C = 0x24,
    MM0 = 0x25,
    MM1 = 0x26,
    M0C = 0x27,
    M1C = 0x28,
    M2C = 0x29,
    M3C = 0x2a,
    M4C = 0x2b,
    M5C = 0x2c,
    M6C = 0x2d,
    M7C = 0x2e,
    IGNORE = 0xff,
}

impl Reg {
    pub fn from(reg: u8) -> Reg {
        match reg {
            0x00 => Reg::M0X,
            0x01 => Reg::M0Y,
            0x02 => Reg::M1X,
            0x03 => Reg::M1Y,
            0x04 => Reg::M2X,
            0x05 => Reg::M2Y,
            0x06 => Reg::M3X,
            0x07 => Reg::M3Y,
            0x08 => Reg::M4X,
            0x09 => Reg::M4Y,
            0x0a => Reg::M5X,
            0x0b => Reg::M5Y,
            0x0c => Reg::M6X,
            0x0d => Reg::M6Y,
            0x0e => Reg::M7X,
            0x0f => Reg::M7Y,
            0x10 => Reg::MX8,
            0x11 => Reg::CR1,
            0x12 => Reg::RASTER,
            0x13 => Reg::LPX,
            0x14 => Reg::LPY,
            0x15 => Reg::ME,
            0x16 => Reg::CR2,
            0x17 => Reg::MYE,
            0x18 => Reg::MEMPTR,
            0x19 => Reg::IRR,
            0x1a => Reg::IMR,
            0x1b => Reg::MDP,
            0x1c => Reg::MMC,
            0x1d => Reg::MXE,
            0x1e => Reg::MM,
            0x1f => Reg::MD,
            0x20 => Reg::EC,
            0x21 => Reg::B0C,
            0x22 => Reg::B1C,
            0x23 => Reg::B2C,
            0x24 => Reg::B3C,
            0x25 => Reg::MM0,
            0x26 => Reg::MM1,
            0x27 => Reg::M0C,
            0x28 => Reg::M1C,
            0x29 => Reg::M2C,
            0x2a => Reg::M3C,
            0x2b => Reg::M4C,
            0x2c => Reg::M5C,
            0x2d => Reg::M6C,
            0x2e => Reg::M7C,
            0x2f..=0x3f => Reg::IGNORE,
            _ => panic!("invalid vic reg {}", reg),
        }
    }
}

enum IrqSource {
    Raster = 0,
    SpriteBackgroundCollision = 1,
    SpriteSpriteCollision = 2,
    LightPen = 3,
}

#[derive(Copy, Clone)]
struct SpriteReg {
    enabled: bool,
    x: u16,
    y: u8,
    color: u8,
    expand_x: bool,
    expand_y: bool,
    multicolor: bool,
    priority: bool,
    collide_sprite: bool,
    collide_data: bool,
}

impl SpriteReg {
    pub fn new() -> Self {
        SpriteReg {
            enabled: false,
            x: 0,
            y: 0,
            color: 0,
            expand_x: false,
            expand_y: false,
            multicolor: false,
            priority: true,
            collide_sprite: false,
            collide_data: false,
        }
    }
}

/// Cycle-accurate VIC-II raster pipeline.
///
/// Each `clock()` call advances the chip by one Phi1 cycle, driving the sub-units
/// (`BorderUnit`, `GfxSequencer`, `SpriteSequencer`, `MuxUnit`) through the fetch/draw
/// sequence of a single raster cycle and producing one 8-pixel burst into the frame
/// buffer.
pub struct Vic {
    // Dependencies
    mem: Shared<VicMemory>,
    frame_buffer: Shared<RenderTarget>,
    ba_line: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    spec: Spec,
    // Functional units
    border_unit: BorderUnit,
    gfx_sequencer: GfxSequencer,
    sprite_sequencers: [SpriteSequencer; 8],
    mux_unit: MuxUnit,
    // Control registers
    enabled: bool,
    rsel: bool,
    scroll_x: u8,
    scroll_y: u8,
    irq_enable: u8,
    irq_status: u8,
    video_matrix: u16,
    char_base: u16,
    light_pen_pos: [u8; 2],
    sprites: [SpriteReg; 8],
    sprite_multicolor: [u8; 2],
    // Internal counters
    raster_y: u16,
    raster_cycle: u16,
    raster_compare: u16,
    vc: u16,
    vc_base: u16,
    rc: u8,
    vmli: usize,
    video_matrix_line: [u8; 40],
    color_line: [u8; 40],
    is_bad_line: bool,
    ba_delay: u8,
    display_active: bool,
    sprite_dma: [bool; 8],
    sprite_mc: [u8; 8],
}

impl Vic {
    pub fn new(
        chip_model: VicModel,
        mem: Shared<VicMemory>,
        frame_buffer: Shared<RenderTarget>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        Vic {
            mem,
            frame_buffer,
            ba_line,
            irq_line,
            spec: Spec::new(chip_model),
            border_unit: BorderUnit::new(),
            gfx_sequencer: GfxSequencer::new(),
            sprite_sequencers: [
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
            ],
            mux_unit: MuxUnit::new(),
            enabled: true,
            rsel: true,
            scroll_x: 0,
            scroll_y: 3,
            irq_enable: 0x00,
            irq_status: 0x00,
            video_matrix: 0x0400,
            char_base: 0x1000,
            light_pen_pos: [0; 2],
            sprites: [SpriteReg::new(); 8],
            sprite_multicolor: [0; 2],
            raster_y: 0,
            raster_cycle: 1,
            raster_compare: 0,
            vc: 0,
            vc_base: 0,
            rc: 0,
            vmli: 0,
            video_matrix_line: [0; 40],
            color_line: [0; 40],
            is_bad_line: false,
            ba_delay: 0,
            display_active: false,
            sprite_dma: [false; 8],
            sprite_mc: [0; 8],
        }
    }

    pub fn get_raster(&self) -> u16 {
        self.raster_y
    }

    /// `mem`/`frame_buffer`/`ba_line`/`irq_line`/`spec` are wiring and chip-model
    /// configuration fixed at construction, not state; everything else that
    /// drives a raster line's output travels here.
    pub fn save_state(&self, w: &mut StateWriter) {
        self.border_unit.save_state(w);
        self.gfx_sequencer.save_state(w);
        for seq in &self.sprite_sequencers {
            seq.save_state(w);
        }
        self.mux_unit.save_state(w);

        w.write_bool(self.enabled);
        w.write_bool(self.rsel);
        w.write_u8(self.scroll_x);
        w.write_u8(self.scroll_y);
        w.write_u8(self.irq_enable);
        w.write_u8(self.irq_status);
        w.write_u16(self.video_matrix);
        w.write_u16(self.char_base);
        w.write_bytes(&self.light_pen_pos);
        for sprite in &self.sprites {
            w.write_bool(sprite.enabled);
            w.write_u16(sprite.x);
            w.write_u8(sprite.y);
            w.write_u8(sprite.color);
            w.write_bool(sprite.expand_x);
            w.write_bool(sprite.expand_y);
            w.write_bool(sprite.multicolor);
            w.write_bool(sprite.priority);
            w.write_bool(sprite.collide_sprite);
            w.write_bool(sprite.collide_data);
        }
        w.write_bytes(&self.sprite_multicolor);

        w.write_u16(self.raster_y);
        w.write_u16(self.raster_cycle);
        w.write_u16(self.raster_compare);
        w.write_u16(self.vc);
        w.write_u16(self.vc_base);
        w.write_u8(self.rc);
        w.write_u32(self.vmli as u32);
        w.write_bytes(&self.video_matrix_line);
        w.write_bytes(&self.color_line);
        w.write_bool(self.is_bad_line);
        w.write_u8(self.ba_delay);
        w.write_bool(self.display_active);
        for &dma in &self.sprite_dma {
            w.write_bool(dma);
        }
        w.write_bytes(&self.sprite_mc);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        self.border_unit.load_state(r);
        self.gfx_sequencer.load_state(r);
        for seq in self.sprite_sequencers.iter_mut() {
            seq.load_state(r);
        }
        self.mux_unit.load_state(r);

        self.enabled = r.read_bool();
        self.rsel = r.read_bool();
        self.scroll_x = r.read_u8();
        self.scroll_y = r.read_u8();
        self.irq_enable = r.read_u8();
        self.irq_status = r.read_u8();
        self.video_matrix = r.read_u16();
        self.char_base = r.read_u16();
        self.light_pen_pos.copy_from_slice(r.read_bytes(2));
        for sprite in self.sprites.iter_mut() {
            sprite.enabled = r.read_bool();
            sprite.x = r.read_u16();
            sprite.y = r.read_u8();
            sprite.color = r.read_u8();
            sprite.expand_x = r.read_bool();
            sprite.expand_y = r.read_bool();
            sprite.multicolor = r.read_bool();
            sprite.priority = r.read_bool();
            sprite.collide_sprite = r.read_bool();
            sprite.collide_data = r.read_bool();
        }
        self.sprite_multicolor.copy_from_slice(r.read_bytes(2));

        self.raster_y = r.read_u16();
        self.raster_cycle = r.read_u16();
        self.raster_compare = r.read_u16();
        self.vc = r.read_u16();
        self.vc_base = r.read_u16();
        self.rc = r.read_u8();
        self.vmli = r.read_u32() as usize;
        self.video_matrix_line.copy_from_slice(r.read_bytes(40));
        self.color_line.copy_from_slice(r.read_bytes(40));
        self.is_bad_line = r.read_bool();
        self.ba_delay = r.read_u8();
        self.display_active = r.read_bool();
        for dma in self.sprite_dma.iter_mut() {
            *dma = r.read_bool();
        }
        self.sprite_mc.copy_from_slice(r.read_bytes(8));
    }

    pub fn read(&mut self, reg: u8) -> u8 {
        match Reg::from(reg) {
            Reg::M0X => (self.sprites[0].x & 0x00ff) as u8,
            Reg::M0Y => self.sprites[0].y,
            Reg::M1X => (self.sprites[1].x & 0x00ff) as u8,
            Reg::M1Y => self.sprites[1].y,
            Reg::M2X => (self.sprites[2].x & 0x00ff) as u8,
            Reg::M2Y => self.sprites[2].y,
            Reg::M3X => (self.sprites[3].x & 0x00ff) as u8,
            Reg::M3Y => self.sprites[3].y,
            Reg::M4X => (self.sprites[4].x & 0x00ff) as u8,
            Reg::M4Y => self.sprites[4].y,
            Reg::M5X => (self.sprites[5].x & 0x00ff) as u8,
            Reg::M5Y => self.sprites[5].y,
            Reg::M6X => (self.sprites[6].x & 0x00ff) as u8,
            Reg::M6Y => self.sprites[6].y,
            Reg::M7X => (self.sprites[7].x & 0x00ff) as u8,
            Reg::M7Y => self.sprites[7].y,
            Reg::MX8 => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].x.get_bit(8));
                }
                result
            }
            Reg::CR1 => {
                let mut result = 0u8;
                result.set_bit(7, self.raster_y.get_bit(8));
                result.set_bit(6, self.gfx_sequencer.config.mode.value().get_bit(2));
                result.set_bit(5, self.gfx_sequencer.config.mode.value().get_bit(1));
                result.set_bit(4, self.enabled);
                result.set_bit(3, self.rsel);
                result | (self.scroll_y & 0x07)
            }
            Reg::RASTER => (self.raster_y & 0x00ff) as u8,
            Reg::LPX => self.light_pen_pos[0],
            Reg::LPY => self.light_pen_pos[1],
            Reg::ME => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].enabled);
                }
                result
            }
            Reg::CR2 => {
                let mut result = 0xc0u8;
                result.set_bit(5, true);
                result.set_bit(4, self.gfx_sequencer.config.mode.value().get_bit(0));
                result.set_bit(3, self.border_unit.config.csel);
                result | (self.gfx_sequencer_x_scroll() & 0x07)
            }
            Reg::MYE => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].expand_y);
                }
                result
            }
            Reg::MEMPTR => {
                let vm = ((self.video_matrix >> 10) as u8 & 0x0f) << 4;
                let cb = ((self.char_base >> 11) as u8 & 0x07) << 1;
                vm | cb | 0x01
            }
            Reg::IRR => {
                let mut result = self.irq_status & 0x0f;
                result.set_bit(7, self.is_irq_triggered());
                result | 0x70
            }
            Reg::IMR => self.irq_enable & 0x0f,
            Reg::MDP => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].priority);
                }
                result
            }
            Reg::MMC => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].multicolor);
                }
                result
            }
            Reg::MXE => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].expand_x);
                }
                result
            }
            Reg::MM => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].collide_sprite);
                    self.sprites[i].collide_sprite = false;
                }
                result
            }
            Reg::MD => {
                let mut result = 0u8;
                for i in 0..8 {
                    result.set_bit(i, self.sprites[i].collide_data);
                    self.sprites[i].collide_data = false;
                }
                result
            }
            Reg::EC => self.border_unit.config.border_color | 0xf0,
            Reg::B0C => self.gfx_sequencer.config.bg_color[0] | 0xf0,
            Reg::B1C => self.gfx_sequencer.config.bg_color[1] | 0xf0,
            Reg::B2C => self.gfx_sequencer.config.bg_color[2] | 0xf0,
            Reg::B3C => self.gfx_sequencer.config.bg_color[3] | 0xf0,
            Reg::MM0 => self.sprite_multicolor[0] | 0xf0,
            Reg::MM1 => self.sprite_multicolor[1] | 0xf0,
            Reg::M0C => self.sprites[0].color | 0xf0,
            Reg::M1C => self.sprites[1].color | 0xf0,
            Reg::M2C => self.sprites[2].color | 0xf0,
            Reg::M3C => self.sprites[3].color | 0xf0,
            Reg::M4C => self.sprites[4].color | 0xf0,
            Reg::M5C => self.sprites[5].color | 0xf0,
            Reg::M6C => self.sprites[6].color | 0xf0,
            Reg::M7C => self.sprites[7].color | 0xf0,
            Reg::IGNORE => 0xff,
        }
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        match Reg::from(reg) {
            Reg::M0X => self.sprites[0].x = (self.sprites[0].x & 0xff00) | value as u16,
            Reg::M0Y => self.sprites[0].y = value,
            Reg::M1X => self.sprites[1].x = (self.sprites[1].x & 0xff00) | value as u16,
            Reg::M1Y => self.sprites[1].y = value,
            Reg::M2X => self.sprites[2].x = (self.sprites[2].x & 0xff00) | value as u16,
            Reg::M2Y => self.sprites[2].y = value,
            Reg::M3X => self.sprites[3].x = (self.sprites[3].x & 0xff00) | value as u16,
            Reg::M3Y => self.sprites[3].y = value,
            Reg::M4X => self.sprites[4].x = (self.sprites[4].x & 0xff00) | value as u16,
            Reg::M4Y => self.sprites[4].y = value,
            Reg::M5X => self.sprites[5].x = (self.sprites[5].x & 0xff00) | value as u16,
            Reg::M5Y => self.sprites[5].y = value,
            Reg::M6X => self.sprites[6].x = (self.sprites[6].x & 0xff00) | value as u16,
            Reg::M6Y => self.sprites[6].y = value,
            Reg::M7X => self.sprites[7].x = (self.sprites[7].x & 0xff00) | value as u16,
            Reg::M7Y => self.sprites[7].y = value,
            Reg::MX8 => {
                for i in 0..8 {
                    self.sprites[i].x.set_bit(8, value.get_bit(i));
                }
            }
            Reg::CR1 => {
                self.raster_compare.set_bit(8, value.get_bit(7));
                let mode = (self.gfx_sequencer.config.mode.value() & 0b001)
                    | (value.get_bit(6) as u8) << 2
                    | (value.get_bit(5) as u8) << 1;
                self.gfx_sequencer.config.mode = Mode::from(mode);
                self.enabled = value.get_bit(4);
                self.rsel = value.get_bit(3);
                self.border_unit.config.rsel = self.rsel;
                self.scroll_y = value & 0x07;
            }
            Reg::RASTER => self.raster_compare = (self.raster_compare & 0xff00) | value as u16,
            Reg::LPX => self.light_pen_pos[0] = value,
            Reg::LPY => self.light_pen_pos[1] = value,
            Reg::ME => {
                for i in 0..8 {
                    self.sprites[i].enabled = value.get_bit(i);
                }
            }
            Reg::CR2 => {
                let mode = (self.gfx_sequencer.config.mode.value() & 0b110) | value.get_bit(4) as u8;
                self.gfx_sequencer.config.mode = Mode::from(mode);
                self.border_unit.config.csel = value.get_bit(3);
                self.set_gfx_sequencer_x_scroll(value & 0x07);
            }
            Reg::MYE => {
                for i in 0..8 {
                    self.sprites[i].expand_y = value.get_bit(i);
                }
            }
            Reg::MEMPTR => {
                self.video_matrix = ((value >> 4) as u16) << 10;
                self.char_base = ((value >> 1) as u16 & 0x07) << 11;
            }
            Reg::IRR => {
                self.irq_status &= !(value & 0x0f);
                self.update_irq();
            }
            Reg::IMR => {
                self.irq_enable = value & 0x0f;
                self.update_irq();
            }
            Reg::MDP => {
                for i in 0..8 {
                    self.sprites[i].priority = value.get_bit(i);
                }
            }
            Reg::MMC => {
                for i in 0..8 {
                    self.sprites[i].multicolor = value.get_bit(i);
                }
            }
            Reg::MXE => {
                for i in 0..8 {
                    self.sprites[i].expand_x = value.get_bit(i);
                }
            }
            Reg::MM => {}
            Reg::MD => {}
            Reg::EC => self.border_unit.config.border_color = value & 0x0f,
            Reg::B0C => self.gfx_sequencer.config.bg_color[0] = value & 0x0f,
            Reg::B1C => self.gfx_sequencer.config.bg_color[1] = value & 0x0f,
            Reg::B2C => self.gfx_sequencer.config.bg_color[2] = value & 0x0f,
            Reg::B3C => self.gfx_sequencer.config.bg_color[3] = value & 0x0f,
            Reg::MM0 => self.sprite_multicolor[0] = value & 0x0f,
            Reg::MM1 => self.sprite_multicolor[1] = value & 0x0f,
            Reg::M0C => self.sprites[0].color = value & 0x0f,
            Reg::M1C => self.sprites[1].color = value & 0x0f,
            Reg::M2C => self.sprites[2].color = value & 0x0f,
            Reg::M3C => self.sprites[3].color = value & 0x0f,
            Reg::M4C => self.sprites[4].color = value & 0x0f,
            Reg::M5C => self.sprites[5].color = value & 0x0f,
            Reg::M6C => self.sprites[6].color = value & 0x0f,
            Reg::M7C => self.sprites[7].color = value & 0x0f,
            Reg::IGNORE => {}
        }
    }

    fn gfx_sequencer_x_scroll(&self) -> u8 {
        self.scroll_x
    }

    fn set_gfx_sequencer_x_scroll(&mut self, value: u8) {
        self.scroll_x = value;
    }

    fn is_irq_triggered(&self) -> bool {
        (self.irq_status & self.irq_enable & 0x0f) != 0
    }

    fn update_irq(&mut self) {
        self.irq_line.borrow_mut().set_low(0, self.is_irq_triggered());
    }

    fn trigger_irq(&mut self, source: IrqSource) {
        self.irq_status.set_bit(source as usize, true);
        self.update_irq();
    }

    /// Returns true on lines where the VIC steals the bus from the CPU to
    /// refresh the video matrix/color line buffers (cycles 12-54).
    fn eval_bad_line(&mut self) {
        self.is_bad_line = self.enabled
            && self.raster_y >= 0x30
            && self.raster_y <= 0xf7
            && (self.raster_y & 0x07) as u8 == self.scroll_y;
        if self.is_bad_line {
            self.display_active = true;
        }
    }

    fn set_ba(&mut self, active: bool) {
        // BA goes low (bus request) three cycles before the actual stall,
        // giving the cpu time to finish any in-flight write cycle.
        if active {
            self.ba_delay = 3;
        }
        if self.ba_delay > 0 {
            self.ba_line.borrow_mut().set_active(false);
        } else {
            self.ba_line.borrow_mut().set_active(true);
        }
    }

    fn x_coord(&self) -> u16 {
        (self.raster_cycle - 1) * 8
    }

    /// Turns sprite DMA on for any sprite whose Y register matches the current raster
    /// line; DMA then stays on for 21 lines (63 data bytes, 3 per line) until `fetch_sprite_dma`
    /// counts it back down.
    fn eval_sprite_dma(&mut self) {
        for i in 0..8 {
            if !self.sprite_dma[i]
                && self.sprites[i].enabled
                && self.sprites[i].y == (self.raster_y & 0xff) as u8
            {
                self.sprite_dma[i] = true;
                self.sprite_mc[i] = 0;
            }
        }
    }

    /// p-access + s-access: reads the sprite's pointer byte from the last 8 bytes of the
    /// video matrix, then the 3 data bytes it points at, advancing the sprite through its
    /// 63-byte (21-line) data block.
    fn fetch_sprite_dma(&mut self, i: usize) {
        if !self.sprite_dma[i] {
            return;
        }
        let ptr_addr = self.video_matrix + 0x03f8 + i as u16;
        let (b0, b1, b2) = {
            let mem = self.mem.borrow();
            let base = (mem.read(ptr_addr) as u16) << 6;
            let mc = self.sprite_mc[i] as u16;
            (mem.read(base + mc), mem.read(base + mc + 1), mem.read(base + mc + 2))
        };
        self.sprite_sequencers[i].set_data(0, b0);
        self.sprite_sequencers[i].set_data(1, b1);
        self.sprite_sequencers[i].set_data(2, b2);
        self.sprite_mc[i] = self.sprite_mc[i].wrapping_add(3);
        if self.sprite_mc[i] >= 63 {
            self.sprite_dma[i] = false;
            self.sprite_mc[i] = 0;
        }
    }

    fn sync_sprite_sequencers(&mut self) {
        for i in 0..8 {
            let sprite = self.sprites[i];
            let dma = self.sprite_dma[i];
            let seq = &mut self.sprite_sequencers[i];
            seq.config.color = sprite.color;
            seq.config.data_priority = sprite.priority;
            seq.config.enabled = sprite.enabled;
            seq.config.expand_x = sprite.expand_x;
            seq.config.expand_y = sprite.expand_y;
            seq.config.mode = if sprite.multicolor {
                SpriteMode::Multicolor
            } else {
                SpriteMode::Standard
            };
            seq.config.multicolor = self.sprite_multicolor;
            seq.config.x_screen = sprite.x;
            seq.display = dma;
            seq.dma = dma;
            self.mux_unit.data_priority[i] = sprite.priority;
        }
    }

    /// Sprite-sprite and sprite-background collisions are latched sticky until the host
    /// reads $D01E/$D01F; each newly observed collision also raises its IRQ source.
    fn eval_collisions(&mut self, sprite_pixels: &[Option<u8>; 8], gfx_foreground: bool) {
        let mut collision_mask = 0u8;
        for i in 0..8 {
            if sprite_pixels[i].is_some() {
                collision_mask.set_bit(i, true);
            }
        }
        if collision_mask.count_ones() >= 2 {
            for i in 0..8 {
                if collision_mask.get_bit(i) {
                    self.sprites[i].collide_sprite = true;
                }
            }
            self.trigger_irq(IrqSource::SpriteSpriteCollision);
        }
        if gfx_foreground && collision_mask != 0 {
            for i in 0..8 {
                if collision_mask.get_bit(i) {
                    self.sprites[i].collide_data = true;
                }
            }
            self.trigger_irq(IrqSource::SpriteBackgroundCollision);
        }
    }

    /// Advances the VIC-II by one Phi1 cycle.
    pub fn clock(&mut self) {
        if self.ba_delay > 0 {
            self.ba_delay -= 1;
        }
        match self.raster_cycle {
            1 => {
                self.eval_bad_line();
            }
            11..=13 => {
                self.set_ba(self.is_bad_line);
            }
            14 => {
                self.vc = self.vc_base;
                self.vmli = 0;
                if self.is_bad_line {
                    self.rc = 0;
                }
                self.set_ba(self.is_bad_line);
            }
            15..=54 => {
                self.set_ba(self.is_bad_line && self.raster_cycle <= 54);
                if self.is_bad_line && self.vmli < 40 {
                    self.video_matrix_line[self.vmli] =
                        self.mem.borrow().read(self.video_matrix + self.vc);
                    self.color_line[self.vmli] = self.mem.borrow().read(self.video_matrix + self.vc) & 0x0f;
                }
                if self.display_active && self.vmli < 40 {
                    let c_data = self.video_matrix_line[self.vmli];
                    let c_color = self.color_line[self.vmli];
                    let g_address = self.char_base.wrapping_add((c_data as u16) << 3) + self.rc as u16;
                    let g_data = self.mem.borrow().read(g_address);
                    self.gfx_sequencer.set_data(c_data, c_color, g_data);
                    self.gfx_sequencer.load_data();
                    self.vc = self.vc.wrapping_add(1);
                    self.vmli += 1;
                }
            }
            55 => {
                self.set_ba(false);
                if self.rc == 7 {
                    self.display_active = self.is_bad_line;
                    self.vc_base = self.vc;
                }
                if self.display_active {
                    self.rc = (self.rc + 1) & 0x07;
                }
                self.eval_sprite_dma();
            }
            58 => {
                for i in 0..8 {
                    self.fetch_sprite_dma(i);
                }
            }
            _ => {}
        }

        self.sync_sprite_sequencers();
        self.gfx_sequencer.clock();
        let x = self.x_coord();
        let den = self.enabled;
        self.border_unit.update_main_ff(x, self.raster_y, den);
        if self.raster_cycle == self.spec.cycles_per_raster {
            self.border_unit.update_vertical_ff(self.raster_y, den);
        }

        let mut sprite_pixels = [None; 8];
        for i in 0..8 {
            self.sprite_sequencers[i].clock(x);
            sprite_pixels[i] = self.sprite_sequencers[i].output();
        }
        let gfx_output = self.gfx_sequencer.output();
        self.eval_collisions(&sprite_pixels, gfx_output.1);
        self.mux_unit.feed_graphics(gfx_output);
        self.mux_unit.feed_sprites(sprite_pixels);
        self.mux_unit.feed_border(self.border_unit.config.border_color);

        let pixel = if self.border_unit.is_enabled() {
            self.border_unit.config.border_color
        } else {
            self.mux_unit.output()
        };
        for i in 0..8 {
            let px = x + i;
            if px < self.spec.first_x_coord {
                self.frame_buffer.borrow_mut().write(px, self.raster_y, pixel);
            }
        }

        self.raster_cycle += 1;
        if self.raster_cycle > self.spec.cycles_per_raster {
            self.raster_cycle = 1;
            self.raster_y += 1;
            if self.raster_y >= self.spec.raster_lines {
                self.raster_y = 0;
                self.vc_base = 0;
            }
            if self.raster_y == self.raster_compare {
                self.trigger_irq(IrqSource::Raster);
            }
        }
    }
}

impl Chip for Vic {
    fn clock(&mut self) {
        Vic::clock(self)
    }

    fn clock_delta(&mut self, delta: u32) {
        for _ in 0..delta {
            Vic::clock(self);
        }
    }

    fn process_vsync(&mut self) {
        self.frame_buffer.borrow_mut().set_sync(true);
    }

    fn reset(&mut self) {
        self.enabled = true;
        self.rsel = true;
        self.scroll_y = 3;
        self.scroll_x = 0;
        self.irq_enable = 0;
        self.irq_status = 0;
        self.video_matrix = 0x0400;
        self.char_base = 0x1000;
        self.light_pen_pos = [0; 2];
        self.sprites = [SpriteReg::new(); 8];
        self.sprite_multicolor = [0; 2];
        self.raster_y = 0;
        self.raster_cycle = 1;
        self.raster_compare = 0;
        self.vc = 0;
        self.vc_base = 0;
        self.rc = 0;
        self.vmli = 0;
        self.is_bad_line = false;
        self.ba_delay = 0;
        self.display_active = false;
        self.sprite_dma = [false; 8];
        self.sprite_mc = [0; 8];
        self.border_unit.reset();
        self.gfx_sequencer.reset();
        for sprite in self.sprite_sequencers.iter_mut() {
            sprite.reset();
        }
        self.mux_unit.reset();
        self.ba_line.borrow_mut().set_active(true);
        self.irq_line.borrow_mut().reset();
    }

    fn read(&mut self, reg: u8) -> u8 {
        Vic::read(self, reg)
    }

    fn write(&mut self, reg: u8, value: u8) {
        Vic::write(self, reg, value)
    }
}

impl VideoOutput for Vic {
    fn get_dimension(&self) -> (usize, usize) {
        let dim = self.frame_buffer.borrow().get_dimension();
        (dim.width as usize, dim.height as usize)
    }

    fn reset(&mut self) {
        self.frame_buffer.borrow_mut().set_sync(false);
    }

    fn write(&mut self, index: usize, color: u8) {
        let width = self.frame_buffer.borrow().get_dimension().width as usize;
        let x = (index % width) as u16;
        let y = (index / width) as u16;
        self.frame_buffer.borrow_mut().write(x, y, color);
    }
}
