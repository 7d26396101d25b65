//! End-to-end checks across layout, features, model and decoding.

use candle_core::{DType, Device, Tensor};
use swipe_decoder::decode::{greedy_decode, MAX_DECODE_STEPS};
use swipe_decoder::features::{FEATURE_DIM, MAX_STROKE_LEN};
use swipe_decoder::keyboard::remap_trace;
use swipe_decoder::vocab::{target_batch, TokenSequence, VOCAB_SIZE};
use swipe_decoder::{
    BeamSearch, BeamSearchConfig, EncodedTrace, FeatureEncoder, GesturePoint, KeyLayout,
    ModelConfig, SwipeDecoder, SwipeTransformer,
};

fn small_model() -> SwipeTransformer {
    let config = ModelConfig {
        d_model: 32,
        num_heads: 4,
        num_layers: 2,
        ..ModelConfig::default()
    };
    SwipeTransformer::new(config, &Device::Cpu).unwrap()
}

/// `n` points evenly interpolated between two key centers, 20 ms apart.
fn line_between(layout: &KeyLayout, from: char, to: char, n: usize) -> Vec<GesturePoint> {
    let (x0, y0) = layout.center(from).unwrap();
    let (x1, y1) = layout.center(to).unwrap();
    (0..n)
        .map(|i| {
            let f = i as f32 / (n - 1) as f32;
            GesturePoint::new(x0 + f * (x1 - x0), y0 + f * (y1 - y0), i as i64 * 20)
        })
        .collect()
}

#[test]
fn test_q_to_p_is_684_pixels() {
    let layout = KeyLayout::qwerty();
    let (qx, _) = layout.pixel_center('Q').unwrap();
    let (px, _) = layout.pixel_center('P').unwrap();
    assert_eq!(px - qx, 684.0);
}

#[test]
fn test_h_to_o_trace_through_untrained_model() {
    let device = Device::Cpu;
    let layout = KeyLayout::qwerty();
    let model = SwipeTransformer::new(ModelConfig::default(), &device).unwrap();

    let encoded = FeatureEncoder::new(&layout)
        .encode(&line_between(&layout, 'H', 'O', 10))
        .unwrap();
    assert_eq!(encoded.valid_length(), 10);

    let features = encoded.to_tensor(&device).unwrap();
    let target = target_batch(&[TokenSequence::from_word("HO")], &device).unwrap();
    let logits = model
        .forward(&features, &[encoded.valid_length()], &target)
        .unwrap();
    assert_eq!(logits.dims(), &[1, 21, VOCAB_SIZE]);
}

#[test]
fn test_zero_length_trace_has_no_candidates() {
    let model = small_model();
    let features = Tensor::zeros((1, MAX_STROKE_LEN, FEATURE_DIM), DType::F32, &Device::Cpu).unwrap();
    let memory = model.encode(&features, &[0]).unwrap();
    let search = BeamSearch::new(&model, BeamSearchConfig::default()).unwrap();
    assert!(search.search(&memory).unwrap().is_empty());

    let layout = KeyLayout::qwerty();
    let decoder = SwipeDecoder::new(&layout, &model, BeamSearchConfig::default()).unwrap();
    assert!(decoder.decode_encoded(&EncodedTrace::empty()).unwrap().is_empty());
}

#[test]
fn test_every_center_maps_to_its_own_key() {
    let layout = KeyLayout::qwerty();
    for c in 'A'..='Z' {
        let (x, y) = layout.center(c).unwrap();
        assert_eq!(layout.nearest_key(x, y), c);
        let prox = layout.proximity(x, y);
        let argmax = prox
            .iter()
            .enumerate()
            .fold(0, |best, (i, &p)| if p > prox[best] { i } else { best });
        assert_eq!(argmax, layout.nearest_key_index(x, y));
    }
}

#[test]
fn test_beam_width_one_equals_greedy_on_real_trace() {
    let layout = KeyLayout::qwerty();
    let model = small_model();
    let encoded = FeatureEncoder::new(&layout)
        .encode(&line_between(&layout, 'S', 'K', 30))
        .unwrap();
    let features = encoded.to_tensor(model.device()).unwrap();
    let memory = model.encode(&features, &[encoded.valid_length()]).unwrap();

    let config = BeamSearchConfig {
        beam_width: 1,
        ..BeamSearchConfig::default()
    };
    let beams = BeamSearch::new(&model, config).unwrap().search(&memory).unwrap();
    let greedy = greedy_decode(&model, &memory, MAX_DECODE_STEPS).unwrap();
    assert_eq!(beams.len(), 1);
    assert_eq!(beams[0].tokens, greedy);
}

#[test]
fn test_weights_roundtrip_preserves_predictions() {
    let layout = KeyLayout::qwerty();
    let model = small_model();
    let blob = model.save_weights().unwrap();
    let restored = SwipeTransformer::from_blob(&blob, &Device::Cpu).unwrap();
    assert_eq!(restored.config(), model.config());

    let trace = line_between(&layout, 'W', 'D', 25);
    let config = BeamSearchConfig::default();
    let a = SwipeDecoder::new(&layout, &model, config.clone())
        .unwrap()
        .decode_trace(&trace)
        .unwrap();
    let b = SwipeDecoder::new(&layout, &restored, config)
        .unwrap()
        .decode_trace(&trace)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_mobile_trace_remapped_onto_desktop_keys() {
    let mobile = KeyLayout::mobile();
    let desktop = KeyLayout::qwerty();
    let trace = line_between(&mobile, 'Z', 'P', 12);
    let remapped = remap_trace(&mobile, &desktop, &trace);

    assert_eq!(remapped.len(), trace.len());
    for (orig, mapped) in trace.iter().zip(remapped.iter()) {
        assert_eq!(orig.t, mapped.t);
        let key = mobile.nearest_key(orig.x.unwrap(), orig.y.unwrap());
        assert_eq!((mapped.x, mapped.y), {
            let (x, y) = desktop.center(key).unwrap();
            (Some(x), Some(y))
        });
    }
    assert!(FeatureEncoder::new(&desktop).encode(&remapped).is_ok());
}
