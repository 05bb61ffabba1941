//! Signal providers. Each source pushes mono PCM into a ring buffer; one
//! analyser thread turns it into [`SignalFrame`]s and publishes them.

use crate::config::AudioSource;
use crate::signal::{AtomicSignal, SpectrumAnalyser};
use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::HeapRb;
use std::f32::consts::TAU;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEMO_SAMPLE_RATE_HZ: u32 = 48_000;

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

enum Backend {
    Cpal(cpal::Stream),
    Demo(Option<thread::JoinHandle<()>>),
}

pub struct AudioSystem {
    backend: Backend,
    stop: Arc<AtomicBool>,
    analyser_handle: Option<thread::JoinHandle<()>>,
    signal: Arc<AtomicSignal>,
    pub sample_rate_hz: u32,
}

impl AudioSystem {
    pub fn new(source: AudioSource, device_query: Option<&str>) -> anyhow::Result<Self> {
        match source {
            AudioSource::Mic => Self::new_mic(device_query),
            AudioSource::Demo => Self::new_demo(),
        }
    }

    fn new_mic(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb = HeapRb::<f32>::new((sample_rate_hz as usize).saturating_mul(4));
        let (mut prod, cons) = rb.split();

        let err_fn = |err| log::warn!("audio stream error: {err}");
        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        stream.play().context("start input stream")?;
        log::info!("capturing from {device_name} at {sample_rate_hz} Hz, {channels} channel(s)");

        let stop = Arc::new(AtomicBool::new(false));
        let signal = Arc::new(AtomicSignal::new());
        let analyser_handle = spawn_analyser(cons, sample_rate_hz, &stop, &signal);

        Ok(Self {
            backend: Backend::Cpal(stream),
            stop,
            analyser_handle: Some(analyser_handle),
            signal,
            sample_rate_hz,
        })
    }

    fn new_demo() -> anyhow::Result<Self> {
        let sample_rate_hz = DEMO_SAMPLE_RATE_HZ;
        let rb = HeapRb::<f32>::new((sample_rate_hz as usize).saturating_mul(4));
        let (mut prod, cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let signal = Arc::new(AtomicSignal::new());
        let analyser_handle = spawn_analyser(cons, sample_rate_hz, &stop, &signal);

        let stop_for_synth = Arc::clone(&stop);
        let synth_handle = thread::Builder::new()
            .name("hexwave-demo".into())
            .spawn(move || {
                let mut synth = DemoSynth::new(sample_rate_hz, fastrand::u64(..));
                let block = (sample_rate_hz / 100) as usize;
                let mut buf = vec![0.0f32; block];
                let start = Instant::now();
                let mut sent = 0u64;
                while !stop_for_synth.load(Ordering::Relaxed) {
                    let due = (start.elapsed().as_secs_f64() * sample_rate_hz as f64) as u64;
                    if sent > due {
                        thread::sleep(Duration::from_millis(2));
                        continue;
                    }
                    synth.fill(&mut buf);
                    for &s in &buf {
                        let _ = prod.try_push(s);
                    }
                    sent += block as u64;
                }
            })
            .context("spawn demo synth thread")?;
        log::info!("demo source at {sample_rate_hz} Hz");

        Ok(Self {
            backend: Backend::Demo(Some(synth_handle)),
            stop,
            analyser_handle: Some(analyser_handle),
            signal,
            sample_rate_hz,
        })
    }

    pub fn signal(&self) -> Arc<AtomicSignal> {
        Arc::clone(&self.signal)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        match &mut self.backend {
            // The capture stream lives as long as the system and stops when dropped.
            Backend::Cpal(_stream) => {}
            Backend::Demo(handle) => {
                if let Some(h) = handle.take() {
                    let _ = h.join();
                }
            }
        }
        if let Some(h) = self.analyser_handle.take() {
            let _ = h.join();
        }
    }
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let Some(want) = device_query.map(str::to_lowercase) else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default input device found"));
    };

    host.input_devices()
        .context("enumerate input devices")?
        .find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(&want))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("no input device matching: {want}"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    let channels = channels.max(1);
    for frame in data.chunks(channels) {
        let acc: f32 = frame.iter().map(|s| s.to_float_sample()).sum();
        let _ = prod.try_push(acc / channels as f32);
    }
}

fn spawn_analyser(
    mut cons: ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    stop: &Arc<AtomicBool>,
    signal: &Arc<AtomicSignal>,
) -> thread::JoinHandle<()> {
    let stop = Arc::clone(stop);
    let signal = Arc::clone(signal);
    thread::spawn(move || {
        let mut analyser = SpectrumAnalyser::new(sample_rate_hz);
        while !stop.load(Ordering::Relaxed) {
            let mut got_any = false;
            while let Some(s) = cons.try_pop() {
                got_any = true;
                if let Some(frame) = analyser.push(s) {
                    signal.store(&frame);
                }
            }
            if !got_any {
                thread::sleep(Duration::from_millis(1));
            }
        }
    })
}

/// Small looping groove: kick on every beat, off-beat hats, a walking bass and
/// a slow chord pad. Deterministic for a given seed.
pub struct DemoSynth {
    sample_rate: f32,
    n: u64,
    rng: fastrand::Rng,
    pad_phase: [f32; 3],
    bass_phase: f32,
}

const DEMO_BPM: f32 = 118.0;
const BASS_LINE: [f32; 8] = [55.0, 55.0, 65.41, 73.42, 55.0, 82.41, 73.42, 65.41];
const PAD_CHORDS: [[f32; 3]; 4] = [
    [220.0, 261.63, 329.63],
    [196.0, 246.94, 293.66],
    [174.61, 220.0, 261.63],
    [196.0, 246.94, 329.63],
];

impl DemoSynth {
    pub fn new(sample_rate_hz: u32, seed: u64) -> Self {
        Self {
            sample_rate: sample_rate_hz.max(1) as f32,
            n: 0,
            rng: fastrand::Rng::with_seed(seed),
            pad_phase: [0.0; 3],
            bass_phase: 0.0,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let t = self.n as f32 / self.sample_rate;
        self.n += 1;
        let beat_len = 60.0 / DEMO_BPM;
        let beat = t / beat_len;
        let beat_idx = beat.floor() as usize;
        let in_beat = (beat - beat.floor()) * beat_len;

        // Kick: falling sine burst at the start of each beat.
        let kick_env = (-in_beat * 18.0).exp();
        let kick_freq = 48.0 + 110.0 * (-in_beat * 30.0).exp();
        let kick = (TAU * kick_freq * in_beat).sin() * kick_env * 0.9;

        // Hats on the off-beat.
        let half = (beat * 2.0).fract() * beat_len / 2.0;
        let hat = if (beat * 2.0).floor() as u64 % 2 == 1 {
            (self.rng.f32() * 2.0 - 1.0) * (-half * 60.0).exp() * 0.12
        } else {
            0.0
        };

        let bass_freq = BASS_LINE[(beat * 2.0).floor() as usize % BASS_LINE.len()];
        self.bass_phase = (self.bass_phase + bass_freq / self.sample_rate).fract();
        let bass = (self.bass_phase * 2.0 - 1.0) * 0.18 * (-half * 4.0).exp();

        let chord = PAD_CHORDS[(beat_idx / 4) % PAD_CHORDS.len()];
        let swell = 0.5 + 0.5 * (TAU * t / (beat_len * 16.0)).sin();
        let mut pad = 0.0;
        for (phase, freq) in self.pad_phase.iter_mut().zip(chord) {
            *phase = (*phase + freq / self.sample_rate).fract();
            pad += (TAU * *phase).sin();
        }
        pad *= 0.05 * swell;

        (kick + hat + bass + pad).clamp(-1.0, 1.0)
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer as _, Split as _};

    #[test]
    fn demo_synth_is_seeded_and_bounded() {
        let mut a = DemoSynth::new(DEMO_SAMPLE_RATE_HZ, 1);
        let mut b = DemoSynth::new(DEMO_SAMPLE_RATE_HZ, 1);
        let mut buf_a = vec![0.0; 4_800];
        let mut buf_b = vec![0.0; 4_800];
        a.fill(&mut buf_a);
        b.fill(&mut buf_b);
        assert_eq!(buf_a, buf_b);
        assert!(buf_a.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(buf_a.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn demo_synth_drives_the_analyser() {
        let mut synth = DemoSynth::new(DEMO_SAMPLE_RATE_HZ, 7);
        let mut analyser = SpectrumAnalyser::new(DEMO_SAMPLE_RATE_HZ);
        let mut loudest = 0.0f32;
        for _ in 0..DEMO_SAMPLE_RATE_HZ * 2 {
            if let Some(frame) = analyser.push(synth.next_sample()) {
                loudest = loudest.max(frame.volume);
            }
        }
        assert!(loudest > 1_000.0, "demo too quiet: {loudest}");
    }

    #[test]
    fn interleaved_frames_are_downmixed() {
        let (mut prod, mut cons) = HeapRb::<f32>::new(8).split();
        push_interleaved(&[0.5f32, -0.5, 1.0, 0.0], 2, &mut prod);
        assert_eq!(cons.try_pop(), Some(0.0));
        assert_eq!(cons.try_pop(), Some(0.5));
        assert_eq!(cons.try_pop(), None);
    }
}
