// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::mem;

use crate::video::color::Color;
use crate::video::rect::Dimension;

const PIXEL_BYTES: usize = 4;

pub struct RenderTarget {
    dim: Dimension,
    pixels: Vec<u32>,
    sync: bool
}

impl RenderTarget {
    pub fn new(dim: Dimension) -> RenderTarget {
        RenderTarget {
            dim: dim,
            pixels: vec![0; (dim.width as usize) * (dim.height as usize)],
            sync: false,
        }
    }

    pub fn get_dimension(&self) -> Dimension { self.dim }
    pub fn get_pitch(&self) -> usize { self.dim.width as usize * PIXEL_BYTES }
    pub fn get_pixel_data(&self) -> &[u8] {
        unsafe { mem::transmute::<&[u32], &[u8]>(self.pixels.as_ref()) }
    }
    pub fn get_sync(&self) -> bool { self.sync }
    pub fn set_sync(&mut self, value: bool) { self.sync = value; }

    pub fn write(&mut self, x: u16, y: u16, color: u8) {
        let index = self.index(x, y);
        self.pixels[index] =  Color::from(color).rgb();
    }

    // -- Internal Ops

    fn index(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.dim.width as usize) + (x as usize)
    }
}
