//! The audio signal the visuals consume: an overall volume plus a byte spectrum.
//!
//! Producers (capture or synthesis threads) publish [`SignalFrame`]s into an
//! [`AtomicSignal`]; the render loop reads snapshots without locking. Reads may
//! be one frame stale, which is fine for animation.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{fence, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of frequency bins in every spectrum snapshot.
pub const SPECTRUM_BINS: usize = 128;
/// Bins summed into `volume`. The treble end is left out or loud tracks saturate.
pub const VOLUME_BINS: usize = 80;

pub const FFT_SIZE: usize = SPECTRUM_BINS * 2;
const SNAPSHOTS_PER_SEC: u32 = 50;
const SMOOTHING: f32 = 0.8;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalFrame {
    pub volume: f32,
    pub spectrum: [u8; SPECTRUM_BINS],
}

impl Default for SignalFrame {
    fn default() -> Self {
        Self::silence()
    }
}

impl SignalFrame {
    pub const fn silence() -> Self {
        Self {
            volume: 0.0,
            spectrum: [0; SPECTRUM_BINS],
        }
    }

    pub fn from_spectrum(spectrum: [u8; SPECTRUM_BINS]) -> Self {
        let volume = spectrum
            .iter()
            .take(VOLUME_BINS)
            .map(|&v| v as f32)
            .sum();
        Self { volume, spectrum }
    }

    pub fn is_silent(&self) -> bool {
        self.volume <= 0.0 && self.spectrum.iter().all(|&v| v == 0)
    }
}

/// Seqlock-published [`SignalFrame`], written by one producer thread and read by the renderer.
pub struct AtomicSignal {
    seq: AtomicU64,
    volume: AtomicU32,
    spectrum: [AtomicU8; SPECTRUM_BINS],
    updated_ms: AtomicU64,
}

impl Default for AtomicSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicSignal {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            volume: AtomicU32::new(0),
            spectrum: std::array::from_fn(|_| AtomicU8::new(0)),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn store(&self, frame: &SignalFrame) {
        self.seq.fetch_add(1, Ordering::Relaxed); // odd => write in progress
        fence(Ordering::Release);
        self.volume.store(frame.volume.to_bits(), Ordering::Relaxed);
        for (dst, &src) in self.spectrum.iter().zip(frame.spectrum.iter()) {
            dst.store(src, Ordering::Relaxed);
        }
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self) -> SignalFrame {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let volume = f32::from_bits(self.volume.load(Ordering::Relaxed));
            let mut spectrum = [0u8; SPECTRUM_BINS];
            for (dst, src) in spectrum.iter_mut().zip(self.spectrum.iter()) {
                *dst = src.load(Ordering::Relaxed);
            }

            fence(Ordering::Acquire);
            let v2 = self.seq.load(Ordering::Relaxed);
            if v1 == v2 {
                return SignalFrame { volume, spectrum };
            }
        }
    }

    /// Milliseconds since the last `store`, or `None` if nothing was ever stored.
    pub fn age_ms(&self) -> Option<u64> {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return None;
        }
        Some(now_ms().saturating_sub(t))
    }

    /// Like [`load`](Self::load), but a stalled or absent producer reads as silence.
    pub fn load_fresh(&self, max_age_ms: u64) -> SignalFrame {
        match self.age_ms() {
            Some(age) if age <= max_age_ms => self.load(),
            _ => SignalFrame::silence(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

/// Turns a mono PCM stream into byte spectra the way a browser analyser node
/// with a 256-point FFT does: Blackman window, 0.8 temporal smoothing, and a
/// -100..-30 dB range mapped onto 0..=255.
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    history: Vec<f32>,
    write_pos: usize,
    filled: usize,
    hop: usize,
    since_last: usize,
}

impl SpectrumAnalyser {
    pub fn new(sample_rate_hz: u32) -> Self {
        let n = FFT_SIZE;
        let window = (0..n)
            .map(|i| {
                let x = i as f32 / n as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect::<Vec<_>>();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        Self {
            fft,
            window,
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: vec![0.0; SPECTRUM_BINS],
            history: vec![0.0; n],
            write_pos: 0,
            filled: 0,
            hop: (sample_rate_hz / SNAPSHOTS_PER_SEC).max(1) as usize,
            since_last: 0,
        }
    }

    /// Samples between two snapshots (20 ms of audio).
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Feed one sample; yields a snapshot every `hop` samples once a full window is buffered.
    pub fn push(&mut self, sample: f32) -> Option<SignalFrame> {
        let n = self.history.len();
        self.history[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % n;
        if self.filled < n {
            self.filled += 1;
        }
        self.since_last += 1;

        if self.filled == n && self.since_last >= self.hop {
            self.since_last = 0;
            return Some(self.analyse());
        }
        None
    }

    /// Analyse the newest window right now.
    pub fn analyse(&mut self) -> SignalFrame {
        let n = self.fft_buf.len();
        for i in 0..n {
            let s = self.history[(self.write_pos + i) % n];
            self.fft_buf[i].re = s * self.window[i];
            self.fft_buf[i].im = 0.0;
        }
        self.fft.process(&mut self.fft_buf);

        let mut spectrum = [0u8; SPECTRUM_BINS];
        let scale = 1.0 / n as f32;
        let range = MAX_DB - MIN_DB;
        for (k, out) in spectrum.iter_mut().enumerate() {
            let c = self.fft_buf[k];
            let mag = (c.re * c.re + c.im * c.im).sqrt() * scale;
            let s = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * mag;
            self.smoothed[k] = if s.is_finite() { s } else { 0.0 };

            if self.smoothed[k] <= 0.0 {
                continue;
            }
            let db = 20.0 * self.smoothed[k].log10();
            let byte = (255.0 / range * (db - MIN_DB)).floor();
            *out = byte.clamp(0.0, 255.0) as u8;
        }

        SignalFrame::from_spectrum(spectrum)
    }
}
