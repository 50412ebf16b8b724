mod applier;
