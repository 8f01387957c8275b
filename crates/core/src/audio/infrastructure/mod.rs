pub mod ffmpeg_audio_reader;
