//! Extraction over realistic source pairs, checked through the matcher.
//!
//! Tests: an Android-style Java class against a C++ bridge with macros, raw strings,
//! commented-out functions and forward declarations.

use jnicheck_core::{Language, MatchStatus, Matcher, SourceUnit};
use parser::Extractor;
use pretty_assertions::assert_eq;

const BRIDGE_JAVA: &str = r#"package com.example;

import androidx.annotation.Keep;

@Keep
public final class Bridge {
    private Bridge() {}

    public static native String nativeVersion();
    public native void nativeSend(String message);
    public native void nativeSend(byte[] payload);
}
"#;

const BRIDGE_CPP: &str = r#"#include <jni.h>
#include <string>

#define JNI_METHOD(name) Java_com_example_Bridge_##name

namespace {
const char* kTag = "Java_com_example_Bridge_fake(";
}

// JNIEXPORT void JNICALL Java_com_example_Bridge_old(JNIEnv*, jobject) {}

extern "C" {

JNIEXPORT jstring JNICALL
Java_com_example_Bridge_nativeVersion(JNIEnv* env, jclass) {
  std::string v = R"(Java_com_example_Bridge_raw() { })";
  return env->NewStringUTF(v.c_str());
}

JNIEXPORT void JNICALL Java_com_example_Bridge_nativeSend__Ljava_lang_String_2(JNIEnv*, jobject, jstring);

}  // extern "C"
"#;

#[test]
fn test_native_extraction_skips_noise() {
  let extractor = Extractor::default();
  let out = extractor.extract(&SourceUnit::from_text("cpp/bridge.cpp", Language::Cpp, BRIDGE_CPP));

  assert!(out.warnings.is_empty(), "{:?}", out.warnings);
  let found: Vec<(&str, bool, u32)> = out
    .implemented
    .iter()
    .map(|i| (i.symbol.as_str(), i.is_definition, i.origin.line))
    .collect();
  assert_eq!(
    found,
    vec![
      ("Java_com_example_Bridge_nativeVersion", true, 15),
      ("Java_com_example_Bridge_nativeSend__Ljava_lang_String_2", false, 20),
    ]
  );
  assert!(out.implemented.iter().all(|i| i.exported));
  assert_eq!(out.implemented[1].overload_suffix.as_deref(), Some("Ljava_lang_String_2"));
}

#[test]
fn test_java_and_native_sides_match() {
  let extractor = Extractor::default();
  let java = extractor.extract(&SourceUnit::from_text("java/Bridge.java", Language::Java, BRIDGE_JAVA));
  let native = extractor.extract(&SourceUnit::from_text("cpp/bridge.cpp", Language::Cpp, BRIDGE_CPP));
  assert!(java.warnings.is_empty(), "{:?}", java.warnings);

  let results = Matcher::default().run(&java.declared, &native.implemented);
  let summary: Vec<(&str, MatchStatus)> = results.iter().map(|r| (r.key.symbol.as_str(), r.status)).collect();
  assert_eq!(
    summary,
    vec![
      (
        "Java_com_example_Bridge_nativeSend__Ljava_lang_String_2",
        MatchStatus::Matched
      ),
      ("Java_com_example_Bridge_nativeSend___3B", MatchStatus::MissingImplementation),
      ("Java_com_example_Bridge_nativeVersion", MatchStatus::Matched),
    ]
  );
  assert!(results[0].declaration_only());
}
